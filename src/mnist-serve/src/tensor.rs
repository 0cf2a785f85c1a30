use serde_json::Value;
use tch::Tensor;

use crate::error::{Error, Result};

/// Build an `f32` tensor from a nested JSON array, taking the shape from the
/// nesting. The top level must be an array.
pub fn tensor_from_json(value: &Value) -> Result<Tensor> {
    if !value.is_array() {
        return Err(Error::Shape(format!(
            "data must be a sequence (got {})",
            value
        )));
    }

    let (shape, values) = flatten(value)?;

    Ok(Tensor::from_slice(&values).f_reshape(shape.as_slice())?)
}

/// Split a nested JSON array into its shape and its row-major values.
///
/// The shape is read off the first element at every depth; every other
/// element must agree with it.
pub fn flatten(value: &Value) -> Result<(Vec<i64>, Vec<f32>)> {
    let shape = infer_shape(value);
    let mut values = Vec::with_capacity(shape.iter().product::<i64>().max(0) as usize);
    collect(value, &shape, 0, &mut values)?;

    Ok((shape, values))
}

fn infer_shape(value: &Value) -> Vec<i64> {
    let mut shape = Vec::new();
    let mut current = value;

    while let Value::Array(items) = current {
        shape.push(items.len() as i64);
        match items.first() {
            Some(first) => current = first,
            None => break,
        }
    }

    shape
}

fn collect(value: &Value, shape: &[i64], dim: usize, out: &mut Vec<f32>) -> Result<()> {
    match (value, shape.get(dim)) {
        (Value::Array(items), Some(&len)) => {
            if items.len() as i64 != len {
                return Err(Error::Shape(format!(
                    "expected sequence of length {} at dim {} (got {})",
                    len,
                    dim,
                    items.len()
                )));
            }
            items
                .iter()
                .try_for_each(|item| collect(item, shape, dim + 1, out))
        }
        (Value::Array(_), None) => Err(Error::Shape(format!(
            "expected a number at dim {} but found a sequence",
            dim
        ))),
        (Value::Number(_), Some(_)) | (Value::Bool(_), Some(_)) => Err(Error::Shape(format!(
            "expected a sequence at dim {} but found a number",
            dim
        ))),
        (Value::Number(n), None) => {
            let v = n
                .as_f64()
                .ok_or_else(|| Error::NotNumeric(n.to_string()))?;
            out.push(v as f32);
            Ok(())
        }
        (Value::Bool(b), None) => {
            out.push(if *b { 1.0 } else { 0.0 });
            Ok(())
        }
        (other, _) => Err(Error::NotNumeric(other.to_string())),
    }
}
