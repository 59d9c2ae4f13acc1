//! Built-in behaviors shipped with the launcher.
//!
//! No physics lives here; these are the generic endpoints every coupling
//! setup needs: a scripted time-series source and a recording sink. Model
//! engines register their own behaviors next to these.

use simlink_core::component::{
  Behavior, BehaviorRegistry, ComponentSpec, ItemSpec, StepOutcome,
};
use simlink_core::{
  ElementSet, Quantity, Result, SimlinkError, Time, TimeSet, Unit, ValueSet2D,
};
use tracing::debug;

/// Register the launcher's built-in component types.
pub fn register_builtins(registry: &mut BehaviorRegistry) {
  registry.register("timeseries_source", |id, task| {
    Ok(Box::new(TimeSeriesSource::from_task(id, task)?))
  });
  registry.register("recording_sink", |id, task| {
    Ok(Box::new(RecordingSink::from_task(id, task)?))
  });
}

fn quantity_from_task(task: &serde_yaml::Value) -> Quantity {
  let caption = task["quantity"].as_str().unwrap_or("value");
  Quantity::new(Unit::unity(), caption, caption)
}

fn elements_from_task(id: &str, task: &serde_yaml::Value) -> Result<ElementSet> {
  let ids: Vec<String> = task["elements"]
    .as_sequence()
    .map(|seq| {
      seq
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
    })
    .unwrap_or_default();
  if ids.is_empty() {
    return Err(SimlinkError::Config(format!(
      "component [{id}]: task declares no elements"
    )));
  }
  let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
  Ok(ElementSet::id_based(format!("{id}-elements"), &id_refs))
}

/// Emits a series scripted in the task file on one output item `out`.
pub struct TimeSeriesSource {
  id: String,
  quantity: Quantity,
  elements: ElementSet,
  series: Vec<(f64, Vec<f64>)>,
  cursor: usize,
}

impl TimeSeriesSource {
  pub fn from_task(id: &str, task: &serde_yaml::Value) -> Result<Self> {
    let elements = elements_from_task(id, task)?;

    let mut series = Vec::new();
    for entry in task["series"].as_sequence().into_iter().flatten() {
      let time = entry["time"].as_f64().ok_or_else(|| {
        SimlinkError::Config(format!("component [{id}]: series entry without time"))
      })?;
      let values: Vec<f64> = entry["values"]
        .as_sequence()
        .map(|seq| seq.iter().filter_map(serde_yaml::Value::as_f64).collect())
        .unwrap_or_default();
      if values.len() != elements.element_count() {
        return Err(SimlinkError::Config(format!(
          "component [{id}]: series entry at {time} has {} values for {} elements",
          values.len(),
          elements.element_count()
        )));
      }
      series.push((time, values));
    }
    if series.len() < 2 {
      return Err(SimlinkError::Config(format!(
        "component [{id}]: series needs at least two entries"
      )));
    }

    Ok(Self {
      id: id.to_string(),
      quantity: quantity_from_task(task),
      elements,
      series,
      cursor: 0,
    })
  }
}

impl Behavior for TimeSeriesSource {
  fn on_initialize(&mut self) -> Result<ComponentSpec> {
    let mut extent = TimeSet::new();
    extent.add_time(Time::stamp(self.series.first().unwrap().0))?;
    extent.add_time(Time::stamp(self.series.last().unwrap().0))?;

    Ok(ComponentSpec {
      caption: format!("time series source [{}]", self.id),
      description: String::new(),
      time_extent: extent,
      outputs: vec![ItemSpec {
        id: "out".into(),
        quantity: self.quantity.clone(),
        element_set: self.elements.clone(),
        time_set: TimeSet::new(),
      }],
      inputs: Vec::new(),
    })
  }

  fn initial_output_values(&mut self) -> Vec<(String, Vec<f64>)> {
    vec![("out".into(), self.series[0].1.clone())]
  }

  fn apply_input(&mut self, input_id: &str, _values: &ValueSet2D) -> Result<()> {
    Err(SimlinkError::ContractViolation(format!(
      "source [{}] has no input [{input_id}]",
      self.id
    )))
  }

  fn perform_step(&mut self, _now: Time) -> Result<StepOutcome> {
    self.cursor += 1;
    let (stamp, values) = self.series.get(self.cursor).cloned().ok_or_else(|| {
      SimlinkError::Computation(format!("source [{}] ran out of series entries", self.id))
    })?;
    Ok(StepOutcome {
      new_time: Time::stamp(stamp),
      output_values: vec![("out".into(), values)],
    })
  }
}

/// Accepts values on one input item `in` and logs what arrives.
pub struct RecordingSink {
  id: String,
  quantity: Quantity,
  elements: ElementSet,
  request_times: Vec<f64>,
  dt: f64,
  now: f64,
  end: f64,
}

impl RecordingSink {
  pub fn from_task(id: &str, task: &serde_yaml::Value) -> Result<Self> {
    let elements = elements_from_task(id, task)?;

    let request_times: Vec<f64> = task["times"]
      .as_sequence()
      .map(|seq| seq.iter().filter_map(serde_yaml::Value::as_f64).collect())
      .unwrap_or_default();
    if request_times.is_empty() {
      return Err(SimlinkError::Config(format!(
        "component [{id}]: task declares no request times"
      )));
    }

    let dt = task["dt"].as_f64().unwrap_or(1.0);
    let start = request_times[0];
    let end = request_times.last().unwrap().max(start + dt);

    Ok(Self {
      id: id.to_string(),
      quantity: quantity_from_task(task),
      elements,
      request_times,
      dt,
      now: start,
      end,
    })
  }
}

impl Behavior for RecordingSink {
  fn on_initialize(&mut self) -> Result<ComponentSpec> {
    let mut extent = TimeSet::new();
    extent.add_time(Time::stamp(self.now))?;
    extent.add_time(Time::stamp(self.end))?;

    let mut requests = TimeSet::new();
    for t in &self.request_times {
      requests.add_time(Time::stamp(*t))?;
    }

    Ok(ComponentSpec {
      caption: format!("recording sink [{}]", self.id),
      description: String::new(),
      time_extent: extent,
      outputs: Vec::new(),
      inputs: vec![ItemSpec {
        id: "in".into(),
        quantity: self.quantity.clone(),
        element_set: self.elements.clone(),
        time_set: requests,
      }],
    })
  }

  fn apply_input(&mut self, input_id: &str, values: &ValueSet2D) -> Result<()> {
    for t in 0..values.time_count() {
      debug!(
        component = %self.id,
        input = input_id,
        row = t,
        values = ?values.row_as_reals(t)?,
        "received"
      );
    }
    Ok(())
  }

  fn perform_step(&mut self, now: Time) -> Result<StepOutcome> {
    self.now = (now.timestamp() + self.dt).min(self.end);
    Ok(StepOutcome {
      new_time: Time::stamp(self.now),
      output_values: Vec::new(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn yaml(text: &str) -> serde_yaml::Value {
    serde_yaml::from_str(text).unwrap()
  }

  #[test]
  fn test_source_from_task() {
    let task = yaml(
      "elements: [e0, e1]\n\
       quantity: discharge\n\
       series:\n\
       - { time: 0.0, values: [1.0, 2.0] }\n\
       - { time: 1.0, values: [3.0, 4.0] }\n",
    );
    let mut source = TimeSeriesSource::from_task("s1", &task).unwrap();
    let spec = source.on_initialize().unwrap();
    assert_eq!(spec.outputs.len(), 1);
    assert_eq!(spec.outputs[0].element_set.element_count(), 2);

    let outcome = source.perform_step(Time::stamp(0.0)).unwrap();
    assert_eq!(outcome.new_time.timestamp(), 1.0);
    assert_eq!(outcome.output_values[0].1, vec![3.0, 4.0]);
  }

  #[test]
  fn test_source_requires_series() {
    let task = yaml("elements: [e0]\nseries: []\n");
    assert!(TimeSeriesSource::from_task("s1", &task).is_err());
  }

  #[test]
  fn test_source_rejects_ragged_series() {
    let task = yaml(
      "elements: [e0, e1]\n\
       series:\n\
       - { time: 0.0, values: [1.0] }\n\
       - { time: 1.0, values: [2.0] }\n",
    );
    assert!(TimeSeriesSource::from_task("s1", &task).is_err());
  }

  #[test]
  fn test_sink_from_task() {
    let task = yaml("elements: [e0]\ntimes: [1.0, 2.0]\ndt: 1.0\n");
    let mut sink = RecordingSink::from_task("r1", &task).unwrap();
    let spec = sink.on_initialize().unwrap();
    assert_eq!(spec.inputs.len(), 1);
    assert_eq!(spec.inputs[0].time_set.len(), 2);
  }

  #[test]
  fn test_sink_requires_times() {
    let task = yaml("elements: [e0]\ntimes: []\n");
    assert!(RecordingSink::from_task("r1", &task).is_err());
  }
}
