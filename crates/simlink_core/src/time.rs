//! Simulation time primitives.
//!
//! Times are carried as fractional days since 1970-01-01 00:00:00 UTC. A time
//! with zero duration is a stamp; a positive duration makes it a span. A
//! [`TimeSet`] keeps an ordered list of either all stamps or all spans and
//! exposes the covered horizon.

use crate::error::{Result, SimlinkError};

/// Comparison tolerance for timestamps: one microsecond expressed in days.
pub const EPSILON_DAYS: f64 = 1e-6 / 86_400.0;

/// A time stamp or time interval, in days since the epoch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Time {
  stamp: f64,
  duration: f64,
}

impl Time {
  /// A stamp (zero duration) at the given day offset.
  pub fn stamp(days: f64) -> Self {
    Self {
      stamp: days.max(0.0),
      duration: 0.0,
    }
  }

  /// A span starting at `days` and lasting `duration_days`.
  pub fn span(days: f64, duration_days: f64) -> Self {
    Self {
      stamp: days.max(0.0),
      duration: duration_days.max(0.0),
    }
  }

  /// The span covering `[start, end]`.
  pub fn between(start: Time, end: Time) -> Self {
    Self::span(start.stamp, (end.stamp - start.stamp).max(0.0))
  }

  pub fn timestamp(&self) -> f64 {
    self.stamp
  }

  pub fn duration_in_days(&self) -> f64 {
    self.duration
  }

  /// End of the interval: `stamp + duration`. Equals the stamp itself for
  /// zero-duration times.
  pub fn end(&self) -> f64 {
    self.stamp + self.duration
  }

  pub fn has_duration(&self) -> bool {
    self.duration > EPSILON_DAYS
  }

  /// Tolerant equality of the start stamps.
  pub fn same_stamp(&self, other: &Time) -> bool {
    (self.stamp - other.stamp).abs() <= EPSILON_DAYS
  }
}

/// An ordered set of times, either all stamps or all spans.
///
/// Stamps are kept strictly increasing by more than [`EPSILON_DAYS`].
/// Insertion is sort-stable and drops duplicates; removal is by position.
#[derive(Clone, Debug, Default)]
pub struct TimeSet {
  times: Vec<Time>,
  offset_from_utc_hours: f64,
}

impl TimeSet {
  pub fn new() -> Self {
    Self {
      times: Vec::new(),
      offset_from_utc_hours: 0.0,
    }
  }

  /// Build a set from unordered times. Fails if stamps and spans are mixed.
  pub fn from_times(mut times: Vec<Time>, offset_from_utc_hours: f64) -> Result<Self> {
    times.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));
    let mut set = Self {
      times: Vec::new(),
      offset_from_utc_hours,
    };
    for time in times {
      set.add_time(time)?;
    }
    Ok(set)
  }

  pub fn times(&self) -> &[Time] {
    &self.times
  }

  pub fn len(&self) -> usize {
    self.times.len()
  }

  pub fn is_empty(&self) -> bool {
    self.times.is_empty()
  }

  /// True when the set holds spans rather than stamps. An empty set has no
  /// durations yet.
  pub fn has_durations(&self) -> bool {
    self.times.first().map(Time::has_duration).unwrap_or(false)
  }

  pub fn offset_from_utc_hours(&self) -> f64 {
    self.offset_from_utc_hours
  }

  pub fn set_offset_from_utc_hours(&mut self, hours: f64) {
    self.offset_from_utc_hours = hours;
  }

  /// The span from the first stamp to the end of the last interval, or `None`
  /// for an empty set.
  pub fn horizon(&self) -> Option<Time> {
    let first = self.times.first()?;
    let last = self.times.last()?;
    Some(Time::span(first.timestamp(), last.end() - first.timestamp()))
  }

  /// End stamp of the horizon, `-inf` when empty. Used by the pull engine to
  /// decide whether a producer must be stepped further.
  pub fn horizon_end(&self) -> f64 {
    self
      .horizon()
      .map(|h| h.end())
      .unwrap_or(f64::NEG_INFINITY)
  }

  /// Insert a time keeping the set sorted. Duplicate stamps (within epsilon)
  /// are silently dropped; mixing stamps and spans fails.
  pub fn add_time(&mut self, time: Time) -> Result<()> {
    if !self.times.is_empty() && self.has_durations() != time.has_duration() {
      return Err(SimlinkError::ContractViolation(format!(
        "cannot add {} to a time set holding {}",
        if time.has_duration() { "a span" } else { "a stamp" },
        if self.has_durations() { "spans" } else { "stamps" },
      )));
    }

    if self.times.iter().any(|t| t.same_stamp(&time)) {
      return Ok(());
    }

    let at = self
      .times
      .partition_point(|t| t.timestamp() < time.timestamp());
    self.times.insert(at, time);
    Ok(())
  }

  /// Remove the time at `index`.
  pub fn remove_time(&mut self, index: usize) -> Result<()> {
    if index >= self.times.len() {
      return Err(SimlinkError::ContractViolation(format!(
        "time index {} out of range {}",
        index,
        self.times.len()
      )));
    }
    self.times.remove(index);
    Ok(())
  }

  /// Drop all leading times with a stamp strictly before `stamp`.
  pub fn remove_before(&mut self, stamp: f64) -> usize {
    let keep = self
      .times
      .iter()
      .position(|t| t.timestamp() >= stamp)
      .unwrap_or(self.times.len());
    self.times.drain(..keep);
    keep
  }

  pub fn clear(&mut self) {
    self.times.clear();
  }
}

#[cfg(test)]
#[path = "time_test.rs"]
mod time_test;
