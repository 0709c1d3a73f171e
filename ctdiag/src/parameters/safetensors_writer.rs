use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use thiserror::Error;

use super::safetensors_metadata::{Dtype, TensorInfo};
use crate::DataType;

#[derive(Debug, Error)]
pub enum SafetensorsWriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "Invalid tensor data for \"{name}\": \
        expected {expected} bytes, got {actual} bytes"
    )]
    InvalidTensorData {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("Duplicate tensor name \"{0}\"")]
    DuplicateTensor(String),
    #[error("Failed to serialize safetensors header: {0}")]
    HeaderJson(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct SafetensorView<'a> {
    pub name: &'a str,
    pub dtype: DataType,
    pub shape: &'a [usize],
    pub data: &'a [u8],
}

impl<'a> SafetensorView<'a> {
    pub fn from_f32(
        name: &'a str,
        shape: &'a [usize],
        values: &'a [f32],
    ) -> Self {
        Self {
            name,
            dtype: DataType::F32,
            shape,
            data: bytemuck::cast_slice(values),
        }
    }
}

/// Writes tensors (in the given order) and optional string metadata to a
/// safetensors file readable by [`super::ParameterLoader`].
pub fn write_safetensors(
    path: &Path,
    tensors: &[SafetensorView<'_>],
    metadata: Option<HashMap<String, String>>,
) -> Result<(), SafetensorsWriteError> {
    let mut offset: usize = 0;
    let mut entries = BTreeMap::new();

    for t in tensors {
        let numel: usize = t.shape.iter().product();
        let expected_bytes = numel.saturating_mul(t.dtype.size_in_bytes());
        let actual_bytes = t.data.len();
        if expected_bytes != actual_bytes {
            return Err(SafetensorsWriteError::InvalidTensorData {
                name: t.name.to_string(),
                expected: expected_bytes,
                actual: actual_bytes,
            });
        }

        let begin = offset;
        let end = offset + actual_bytes;
        offset = end;

        let info = TensorInfo {
            dtype: Dtype::from(t.dtype),
            shape: t.shape.to_vec(),
            data_offsets: (begin, end),
        };
        if entries.insert(t.name.to_string(), info).is_some() {
            return Err(SafetensorsWriteError::DuplicateTensor(
                t.name.to_string(),
            ));
        }
    }

    let mut header = serde_json::Map::new();
    if let Some(metadata) = metadata {
        header.insert(
            "__metadata__".to_string(),
            serde_json::to_value(metadata)?,
        );
    }
    for (name, info) in entries {
        header.insert(name, serde_json::to_value(info)?);
    }
    let mut header_bytes = serde_json::to_vec(&header)?;

    // Headers are padded with spaces to keep the data section 8-byte aligned.
    let padding = (8 - (header_bytes.len() % 8)) % 8;
    header_bytes.extend(std::iter::repeat_n(b' ', padding));

    let header_len = header_bytes.len() as u64;

    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    w.write_all(&header_len.to_le_bytes())?;
    w.write_all(&header_bytes)?;
    for t in tensors {
        w.write_all(t.data)?;
    }
    w.flush()?;
    Ok(())
}
