//! Temporal buffering between producers and consumers.
//!
//! A [`TimeBuffer`] stores `(time, values-per-element)` pairs and answers
//! `values at T` for any requested stamp or span by interpolation inside the
//! stored horizon and extrapolation outside it. The relaxation factor blends
//! between nearest-value extrapolation (1.0) and full linear extrapolation
//! (0.0).

use crate::error::{Result, SimlinkError};
use crate::time::{Time, TimeSet, EPSILON_DAYS};
use crate::values::{ScalarKind, ValueSet2D};

/// Ring of timed element-value rows with interpolating queries.
#[derive(Clone, Debug)]
pub struct TimeBuffer {
  times: TimeSet,
  values: ValueSet2D,
  do_extrapolate: bool,
  relaxation: f64,
}

impl Default for TimeBuffer {
  fn default() -> Self {
    Self::new()
  }
}

impl TimeBuffer {
  pub fn new() -> Self {
    Self {
      times: TimeSet::new(),
      values: ValueSet2D::new(ScalarKind::Real, None),
      do_extrapolate: true,
      relaxation: 1.0,
    }
  }

  pub fn do_extrapolate(&self) -> bool {
    self.do_extrapolate
  }

  pub fn set_do_extrapolate(&mut self, value: bool) {
    self.do_extrapolate = value;
  }

  pub fn relaxation(&self) -> f64 {
    self.relaxation
  }

  /// Set the extrapolation relaxation factor; must be in `[0, 1]`.
  pub fn set_relaxation(&mut self, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
      return Err(SimlinkError::ContractViolation(format!(
        "relaxation factor {value} outside [0, 1]"
      )));
    }
    self.relaxation = value;
    Ok(())
  }

  pub fn time_count(&self) -> usize {
    self.times.len()
  }

  pub fn element_count(&self) -> usize {
    self.values.element_count()
  }

  pub fn times(&self) -> &TimeSet {
    &self.times
  }

  pub fn time_at(&self, step: usize) -> Option<Time> {
    self.times.times().get(step).copied()
  }

  pub fn values_at(&self, step: usize) -> Result<Vec<f64>> {
    self.values.row_as_reals(step)
  }

  /// Append a `(time, values)` pair.
  ///
  /// Stamps and spans must not be mixed. A time that does not advance the
  /// buffer by more than epsilon (or, for spans, overlaps the stored horizon
  /// by more than epsilon) is dropped without effect.
  pub fn add_values(&mut self, time: Time, values: &[f64]) -> Result<()> {
    if self.times.is_empty() {
      self.times.add_time(time)?;
      self.values.push_real_row(values)?;
      return Ok(());
    }

    if self.times.has_durations() {
      if !time.has_duration() {
        return Err(SimlinkError::ContractViolation(
          "time without duration added to a span buffer".into(),
        ));
      }
      // The new span may overlap the stored horizon by at most epsilon.
      if time.timestamp() + EPSILON_DAYS < self.times.horizon_end() {
        return Ok(());
      }
    } else {
      if time.has_duration() {
        return Err(SimlinkError::ContractViolation(
          "time with duration added to a stamp buffer".into(),
        ));
      }
      let last = self.times.times().last().map(Time::timestamp).unwrap_or(0.0);
      if time.timestamp() - EPSILON_DAYS < last {
        return Ok(());
      }
    }

    self.times.add_time(time)?;
    self.values.push_real_row(values)
  }

  /// Overwrite the row stored at `time` or append a new one. Used when a
  /// time step is redone under iterative coupling.
  pub fn set_or_add_values(&mut self, time: Time, values: &[f64]) -> Result<()> {
    let slot = self
      .times
      .times()
      .iter()
      .position(|t| t.same_stamp(&time));

    match slot {
      Some(index) => {
        for (e, value) in values.iter().enumerate() {
          self.values.set_value(index, e, (*value).into())?;
        }
        Ok(())
      }
      None => self.add_values(time, values),
    }
  }

  fn check_buffer(&self) -> Result<()> {
    if self.times.is_empty() {
      return Err(SimlinkError::ContractViolation("time buffer is empty".into()));
    }
    if self.times.len() != self.values.time_count() {
      return Err(SimlinkError::ContractViolation(format!(
        "buffer holds {} times but {} value rows",
        self.times.len(),
        self.values.time_count()
      )));
    }
    Ok(())
  }

  /// Element values at the requested time.
  ///
  /// Dispatches on the four combinations of stored/requested durations. With
  /// extrapolation disabled any request outside the stored horizon by more
  /// than epsilon fails with `OutOfHorizon`.
  pub fn get_values(&self, requested: Time) -> Result<Vec<f64>> {
    self.check_buffer()?;

    let horizon = self.times.horizon().expect("non-empty buffer");
    if !self.do_extrapolate
      && (requested.end() > horizon.end() + EPSILON_DAYS
        || requested.timestamp() < horizon.timestamp() - EPSILON_DAYS)
    {
      return Err(SimlinkError::OutOfHorizon {
        requested: requested.timestamp(),
        start: horizon.timestamp(),
        end: horizon.end(),
      });
    }

    match (self.times.has_durations(), requested.has_duration()) {
      (true, true) => self.spans_to_span(requested),
      (true, false) => self.spans_to_stamp(requested),
      (false, true) => self.stamps_to_span(requested),
      (false, false) => self.stamps_to_stamp(requested),
    }
  }

  fn row(&self, index: usize) -> Result<Vec<f64>> {
    self.values.row_as_reals(index)
  }

  fn stamps(&self) -> Vec<f64> {
    self.times.times().iter().map(Time::timestamp).collect()
  }

  fn ends(&self) -> Vec<f64> {
    self.times.times().iter().map(Time::end).collect()
  }

  // Stamp-stored queries ---------------------------------------------------

  fn stamps_to_stamp(&self, requested: Time) -> Result<Vec<f64>> {
    let stamps = self.stamps();
    let size = stamps.len();
    let tr = requested.timestamp();

    if size == 1 {
      return self.row(0);
    }

    if tr <= stamps[0] {
      // Extrapolate backwards from the first two stamps, blended by the
      // relaxation factor.
      let (s0, s1) = (self.row(0)?, self.row(1)?);
      let slope_t = (tr - stamps[0]) * (1.0 - self.relaxation) / (stamps[0] - stamps[1]);
      return Ok(
        s0.iter()
          .zip(&s1)
          .map(|(a, b)| (a - b) * slope_t + a)
          .collect(),
      );
    }

    if tr > stamps[size - 1] {
      let (s_last, s_prev) = (self.row(size - 1)?, self.row(size - 2)?);
      let slope_t =
        (tr - stamps[size - 1]) * (1.0 - self.relaxation) / (stamps[size - 1] - stamps[size - 2]);
      return Ok(
        s_last
          .iter()
          .zip(&s_prev)
          .map(|(a, b)| (a - b) * slope_t + a)
          .collect(),
      );
    }

    // Interior: interpolate inside the bracketing interval.
    let hi = stamps.partition_point(|&t| t < tr);
    let fraction = (tr - stamps[hi - 1]) / (stamps[hi] - stamps[hi - 1]);
    let (lo_row, hi_row) = (self.row(hi - 1)?, self.row(hi)?);
    Ok(
      lo_row
        .iter()
        .zip(&hi_row)
        .map(|(a, b)| a + fraction * (b - a))
        .collect(),
    )
  }

  fn stamps_to_span(&self, requested: Time) -> Result<Vec<f64>> {
    let stamps = self.stamps();
    let size = stamps.len();
    let elements = self.values.element_count();

    let trb = requested.timestamp();
    let tre = requested.end();
    let mut vr = vec![0.0; elements];

    // Trapezoidal accumulation over every stored interval overlapping the
    // requested span.
    for n in 1..size {
      let tbn = stamps[n - 1];
      let tbnp1 = stamps[n];
      let s_lo = self.row(n - 1)?;
      let s_hi = self.row(n)?;

      if trb <= tbn && tre >= tbnp1 {
        // Interval fully inside the request.
        let factor = (tbnp1 - tbn) / (tre - trb);
        for i in 0..elements {
          vr[i] += 0.5 * (s_lo[i] + s_hi[i]) * factor;
        }
      } else if tbn <= trb && tre <= tbnp1 {
        // Request fully inside the interval: value at the request midpoint.
        let fraction = ((tre + trb) / 2.0 - tbn) / (tbnp1 - tbn);
        for i in 0..elements {
          vr[i] += s_lo[i] + (s_hi[i] - s_lo[i]) * fraction;
        }
      } else if tbn < trb && trb < tbnp1 && tre > tbnp1 {
        // Right part of the interval overlaps.
        let fraction = ((tbnp1 - trb) / 2.0) / (tbnp1 - tbn);
        let factor = (tbnp1 - trb) / (tre - trb);
        for i in 0..elements {
          vr[i] += (s_hi[i] - (s_hi[i] - s_lo[i]) * fraction) * factor;
        }
      } else if trb < tbn && tre > tbn && tre < tbnp1 {
        // Left part of the interval overlaps.
        let fraction = ((tre - tbn) / 2.0) / (tbnp1 - tbn);
        let factor = (tre - tbn) / (tre - trb);
        for i in 0..elements {
          vr[i] += (s_lo[i] + (s_hi[i] - s_lo[i]) * fraction) * factor;
        }
      }
    }

    if size == 1 {
      return self.row(0);
    }

    // Parts of the request outside the stored horizon: two-point
    // extrapolation blended by the relaxation factor.
    let relax = 1.0 - self.relaxation;
    let (tb0, tb1) = (stamps[0], stamps[1]);
    let (tb_last, tb_prev) = (stamps[size - 1], stamps[size - 2]);

    if trb < tb0 && tre > tb0 {
      let fraction = relax * 0.5 * (tb0 - trb) / (tb1 - tb0);
      let factor = (tb0 - trb) / (tre - trb);
      let (s0, s1) = (self.row(0)?, self.row(1)?);
      for i in 0..elements {
        vr[i] += factor * (s0[i] - fraction * (s1[i] - s0[i]));
      }
    }

    if tre > tb_last && trb < tb_last {
      let factor = (tre - tb_last) / (tre - trb);
      let fraction = relax * 0.5 * (tre - tb_last) / (tb_last - tb_prev);
      let (s_last, s_prev) = (self.row(size - 1)?, self.row(size - 2)?);
      for i in 0..elements {
        vr[i] += factor * (s_last[i] + fraction * (s_last[i] - s_prev[i]));
      }
    }

    if trb >= tb_last {
      // Entirely after the horizon.
      let fraction = relax * (0.5 * (trb + tre) - tb_last) / (tb_last - tb_prev);
      let (s_last, s_prev) = (self.row(size - 1)?, self.row(size - 2)?);
      for i in 0..elements {
        vr[i] = s_last[i] + (s_last[i] - s_prev[i]) * fraction;
      }
    }

    if tre <= tb0 {
      // Entirely before the horizon.
      let fraction = relax * (tb0 - 0.5 * (trb + tre)) / (tb1 - tb0);
      let (s0, s1) = (self.row(0)?, self.row(1)?);
      for i in 0..elements {
        vr[i] = s0[i] - (s1[i] - s0[i]) * fraction;
      }
    }

    Ok(vr)
  }

  // Span-stored queries ----------------------------------------------------

  fn spans_to_stamp(&self, requested: Time) -> Result<Vec<f64>> {
    let times = self.times.times();
    let size = times.len();
    let tr = requested.timestamp();

    if size == 1 {
      return self.row(0);
    }

    if tr <= times[0].timestamp() {
      if !self.do_extrapolate {
        // Within epsilon of the first span start; the veto already ran.
        return self.row(0);
      }
      let (tbb0, tbb1) = (times[0].timestamp(), times[1].timestamp());
      let fraction = (tr - tbb0) / (tbb0 - tbb1) * (1.0 - self.relaxation);
      let (s0, s1) = (self.row(0)?, self.row(1)?);
      return Ok(
        s0.iter()
          .zip(&s1)
          .map(|(a, b)| (a - b) * fraction + a)
          .collect(),
      );
    }

    if tr >= times[size - 1].end() {
      if !self.do_extrapolate {
        return self.row(size - 1);
      }
      let (tbe_prev, tbe_last) = (times[size - 2].end(), times[size - 1].end());
      let fraction = (tr - tbe_last) / (tbe_last - tbe_prev) * (1.0 - self.relaxation);
      let (s_last, s_prev) = (self.row(size - 1)?, self.row(size - 2)?);
      return Ok(
        s_last
          .iter()
          .zip(&s_prev)
          .map(|(a, b)| (a - b) * fraction + a)
          .collect(),
      );
    }

    // Piecewise constant inside the covering span.
    let covering = times
      .iter()
      .position(|t| t.timestamp() <= tr && t.end() >= tr)
      // Between spans; take the next one.
      .unwrap_or_else(|| times.partition_point(|t| t.end() < tr));
    self.row(covering.min(size - 1))
  }

  fn spans_to_span(&self, requested: Time) -> Result<Vec<f64>> {
    let times = self.times.times().to_vec();
    let size = times.len();
    let elements = self.values.element_count();

    let trb = requested.timestamp();
    let tre = requested.end();
    let mut vr = vec![0.0; elements];

    let relax = 1.0 - self.relaxation;
    let tbb0 = times[0].timestamp();

    if self.do_extrapolate {
      // Entirely before the first stored span.
      if tre <= tbb0 {
        if size >= 2 && self.relaxation != 1.0 {
          let (tbe0, tbe1) = (times[0].end(), times[1].end());
          let (s0, s1) = (self.row(0)?, self.row(1)?);
          return Ok(
            s0.iter()
              .zip(&s1)
              .map(|(a, b)| a - relax * (b - a) * (tbe0 + tbb0 - tre - trb) / (tbe1 - tbb0))
              .collect(),
          );
        }
        return self.row(0);
      }

      // Leading overhang before the first span.
      if trb < tbb0 {
        let factor = (tbb0 - trb) / (tre - trb);
        if size >= 2 && self.relaxation != 1.0 {
          let (tbe0, tbe1) = (times[0].end(), times[1].end());
          let (s0, s1) = (self.row(0)?, self.row(1)?);
          for i in 0..elements {
            vr[i] += factor * (s0[i] - relax * (s1[i] - s0[i]) * (tbe0 - trb) / (tbe1 - tbb0));
          }
        } else {
          let s0 = self.row(0)?;
          for i in 0..elements {
            vr[i] += s0[i] * factor;
          }
        }
      }

      let tbe_last = times[size - 1].end();

      // Entirely after the last stored span.
      if tbe_last < trb {
        if size >= 2 && self.relaxation != 1.0 {
          let tbe_prev = times[size - 2].end();
          let tbb_prev = times[size - 2].timestamp();
          let (s_last, s_prev) = (self.row(size - 1)?, self.row(size - 2)?);
          return Ok(
            s_last
              .iter()
              .zip(&s_prev)
              .map(|(a, b)| {
                a + relax * (a - b) * (trb + tre - tbe_last - tbe_prev) / (tbe_last - tbb_prev)
              })
              .collect(),
          );
        }
        return self.row(size - 1);
      }

      // Trailing overhang past the last span.
      if tbe_last < tre {
        let factor = (tre - tbe_last) / (tre - trb);
        if size >= 2 && self.relaxation != 1.0 {
          let tbe_prev = times[size - 2].end();
          let tbb_prev = times[size - 2].timestamp();
          let (s_last, s_prev) = (self.row(size - 1)?, self.row(size - 2)?);
          for i in 0..elements {
            vr[i] += factor
              * (s_last[i] + relax * (s_last[i] - s_prev[i]) * (tre - tbe_prev) / (tbe_last - tbb_prev));
          }
        } else {
          let s_last = self.row(size - 1)?;
          for i in 0..elements {
            vr[i] += s_last[i] * factor;
          }
        }
      }
    }

    // Piecewise-constant overlap accounting inside the horizon.
    for (n, span) in times.iter().enumerate() {
      let tbbn = span.timestamp();
      let tben = span.end();
      let sn = self.row(n)?;

      if trb <= tbbn && tre >= tben {
        let factor = (tben - tbbn) / (tre - trb);
        for i in 0..elements {
          vr[i] += sn[i] * factor;
        }
      } else if tbbn <= trb && tre <= tben {
        for i in 0..elements {
          vr[i] += sn[i];
        }
      } else if tbbn < trb && trb < tben && tre > tben {
        let factor = (tben - trb) / (tre - trb);
        for i in 0..elements {
          vr[i] += sn[i] * factor;
        }
      } else if trb < tbbn && tre > tbbn && tre < tben {
        let factor = (tre - tbbn) / (tre - trb);
        for i in 0..elements {
          vr[i] += sn[i] * factor;
        }
      }
    }

    Ok(vr)
  }

  // Retention --------------------------------------------------------------

  /// Drop all entries whose stamp is strictly before `time`.
  pub fn clear_before(&mut self, time: Time) {
    while let Some(first) = self.times.times().first().copied() {
      if first.timestamp() < time.timestamp() {
        let _ = self.times.remove_time(0);
        let _ = self.values.remove_row(0);
      } else {
        break;
      }
    }
  }

  /// Drop all entries whose stamp is at or after `time`.
  pub fn clear_after(&mut self, time: Time) {
    while let Some(last) = self.times.times().last().copied() {
      if last.timestamp() >= time.timestamp() {
        let index = self.times.len() - 1;
        let _ = self.times.remove_time(index);
        let _ = self.values.remove_row(index);
      } else {
        break;
      }
    }
  }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod buffer_test;
