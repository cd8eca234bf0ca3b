use serde_json::{Number, Value};
use std::io;

use crate::eff::{Outcome, Receiver};

const METHODS: [&str; 6] = ["add", "sub", "mul", "min", "max", "neg"];

/// A receiver for basic arithmetic over json numbers. Array arguments are flattened one level, so
/// `add([1, 2], 3)` is `6`. Integers stay integers (overflow is an error); any float operand makes
/// the whole computation floating point.
#[derive(Debug, Default, Clone, Copy)]
pub struct Arithmetic;

enum Operands {
  Integers(Vec<i64>),
  Floats(Vec<f64>),
}

impl Arithmetic {
  pub fn evaluate(&self, method: &str, args: &[Value]) -> io::Result<Value> {
    if !METHODS.contains(&method) {
      return Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("arithmetic has no method '{method}'"),
      ));
    }

    match operands(method, args)? {
      Operands::Integers(values) => integers(method, &values).map(Value::from),
      Operands::Floats(values) => {
        let result = floats(method, &values)?;
        Number::from_f64(result).map(Value::Number).ok_or_else(|| {
          io::Error::new(
            io::ErrorKind::InvalidData,
            format!("'{method}' produced a non-finite number"),
          )
        })
      }
    }
  }
}

impl Receiver for Arithmetic {
  fn invoke(&self, method: &str, args: &[Value]) -> io::Result<Outcome> {
    self.evaluate(method, args).map(Outcome::Immediate)
  }

  fn name(&self) -> &str {
    "arithmetic"
  }
}

fn operands(method: &str, args: &[Value]) -> io::Result<Operands> {
  let mut numbers = Vec::with_capacity(args.len());

  for arg in args {
    match arg {
      Value::Array(items) => numbers.extend(items.iter()),
      other => numbers.push(other),
    }
  }

  let not_a_number = |value: &Value| {
    io::Error::new(
      io::ErrorKind::InvalidInput,
      format!("'{method}' expects numbers, received {value}"),
    )
  };

  if numbers.iter().all(|value| value.as_i64().is_some()) {
    let values = numbers.iter().filter_map(|value| value.as_i64()).collect();
    return Ok(Operands::Integers(values));
  }

  numbers
    .into_iter()
    .map(|value| value.as_f64().ok_or_else(|| not_a_number(value)))
    .collect::<io::Result<Vec<f64>>>()
    .map(Operands::Floats)
}

fn empty(method: &str) -> io::Error {
  io::Error::new(io::ErrorKind::InvalidInput, format!("'{method}' needs at least one number"))
}

fn integers(method: &str, values: &[i64]) -> io::Result<i64> {
  let overflow = || io::Error::new(io::ErrorKind::InvalidData, format!("'{method}' overflowed"));

  match method {
    "add" => values.iter().try_fold(0i64, |acc, value| acc.checked_add(*value)).ok_or_else(overflow),
    "mul" => values.iter().try_fold(1i64, |acc, value| acc.checked_mul(*value)).ok_or_else(overflow),
    "sub" => {
      let (first, rest) = values.split_first().ok_or_else(|| empty(method))?;
      rest.iter().try_fold(*first, |acc, value| acc.checked_sub(*value)).ok_or_else(overflow)
    }
    "min" => values.iter().copied().min().ok_or_else(|| empty(method)),
    "max" => values.iter().copied().max().ok_or_else(|| empty(method)),
    _ => match values {
      [value] => value.checked_neg().ok_or_else(overflow),
      _ => Err(io::Error::new(io::ErrorKind::InvalidInput, "'neg' takes exactly one number")),
    },
  }
}

fn floats(method: &str, values: &[f64]) -> io::Result<f64> {
  match method {
    "add" => Ok(values.iter().sum()),
    "mul" => Ok(values.iter().product()),
    "sub" => {
      let (first, rest) = values.split_first().ok_or_else(|| empty(method))?;
      Ok(rest.iter().fold(*first, |acc, value| acc - value))
    }
    "min" => values.iter().copied().reduce(f64::min).ok_or_else(|| empty(method)),
    "max" => values.iter().copied().reduce(f64::max).ok_or_else(|| empty(method)),
    _ => match values {
      [value] => Ok(-value),
      _ => Err(io::Error::new(io::ErrorKind::InvalidInput, "'neg' takes exactly one number")),
    },
  }
}
