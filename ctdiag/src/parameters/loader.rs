use std::{
    collections::{HashMap, hash_map::Keys},
    fs::File,
    os::unix::fs::FileExt,
};

use bytemuck::{Pod, Zeroable};
use half::{bf16, f16};
use ndarray::{ArrayD, IxDyn};
use thiserror::Error;

use super::safetensors_metadata::{
    Dtype, HashMetadata, HeaderLoadingError, read_metadata,
};
use crate::DataType;

#[derive(Debug, Error)]
pub enum ParameterLoaderError {
    #[error("Array with key \"{0}\" not found.")]
    KeyNotFound(String),
    #[error("Couldn't find any arrays with prefix \"{0}\".")]
    SubtreeNotFound(String),
    #[error("Array with key \"{key}\" has unsupported dtype {dtype:?}.")]
    UnsupportedDtype {
        key: String,
        dtype: Dtype,
    },
    #[error(
        "Size mismatch: array of shape {shape:?} and data type \
        {data_type:?} expected to be {expected_size} bytes, \
        got {actual_size} bytes."
    )]
    SizeMismatch {
        data_type: DataType,
        shape: Box<[usize]>,
        expected_size: usize,
        actual_size: usize,
    },
    #[error("Failed to read data")]
    ArrayLoadingError(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ParameterMetadata {
    shape: Box<[usize]>,
    dtype: Dtype,
    offset: usize,
    size: usize,
}

impl ParameterMetadata {
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

fn st_metadata_into_index(
    global_offset: usize,
    file_len: usize,
    st_metadata: HashMetadata,
) -> Result<HashMap<String, ParameterMetadata>, HeaderLoadingError> {
    st_metadata
        .tensors
        .into_iter()
        .map(|(key, value)| {
            let (local_begin, local_end) = value.data_offsets;
            let end = global_offset.checked_add(local_end);
            if local_begin > local_end || end.is_none_or(|end| end > file_len)
            {
                return Err(HeaderLoadingError::InvalidOffset(key));
            }
            let weight_metadata = ParameterMetadata {
                shape: value.shape.into(),
                dtype: value.dtype,
                offset: global_offset + local_begin,
                size: local_end - local_begin,
            };
            Ok((key, weight_metadata))
        })
        .collect()
}

/// Random-access reader over the tensors of one safetensors file.
///
/// Every tensor is widened to `f32` on read.
pub struct ParameterLoader<'file> {
    index: HashMap<String, ParameterMetadata>,
    metadata: HashMap<String, String>,
    file: &'file File,
}

impl<'file> ParameterLoader<'file> {
    pub fn new(file: &'file File) -> Result<Self, HeaderLoadingError> {
        let (global_offset, st_metadata) = read_metadata(file)?;
        let file_len = usize::try_from(file.metadata()?.len())
            .map_err(|_| HeaderLoadingError::HeaderTooLarge)?;
        let metadata = st_metadata.metadata.clone().unwrap_or_default();
        let index =
            st_metadata_into_index(global_offset, file_len, st_metadata)?;
        Ok(ParameterLoader {
            index,
            metadata,
            file,
        })
    }

    pub fn keys(&self) -> Keys<'_, String, ParameterMetadata> {
        self.index.keys()
    }

    /// String entries of the header's `__metadata__` section.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn shape(
        &self,
        key: &str,
    ) -> Result<&[usize], ParameterLoaderError> {
        self.entry(key).map(ParameterMetadata::shape)
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Result<ArrayD<f32>, ParameterLoaderError> {
        let entry = self.entry(key)?;
        let data_type = entry.dtype.data_type().ok_or_else(|| {
            ParameterLoaderError::UnsupportedDtype {
                key: key.to_string(),
                dtype: entry.dtype,
            }
        })?;
        let num_elements = entry
            .shape
            .iter()
            .try_fold(1usize, |count, &dim| count.checked_mul(dim));
        let expected_size = num_elements
            .and_then(|count| count.checked_mul(data_type.size_in_bytes()));
        let (Some(num_elements), Some(expected_size)) =
            (num_elements, expected_size)
        else {
            return Err(ParameterLoaderError::SizeMismatch {
                data_type,
                shape: entry.shape.clone(),
                expected_size: usize::MAX,
                actual_size: entry.size,
            });
        };
        if expected_size != entry.size {
            return Err(ParameterLoaderError::SizeMismatch {
                data_type,
                shape: entry.shape.clone(),
                expected_size,
                actual_size: entry.size,
            });
        }

        let values: Vec<f32> = match data_type {
            DataType::F32 => self.read_elements::<f32>(entry, num_elements)?,
            DataType::F64 => self
                .read_elements::<f64>(entry, num_elements)?
                .into_iter()
                .map(|x| x as f32)
                .collect(),
            DataType::F16 => self
                .read_elements::<f16>(entry, num_elements)?
                .into_iter()
                .map(f16::to_f32)
                .collect(),
            DataType::BF16 => self
                .read_elements::<bf16>(entry, num_elements)?
                .into_iter()
                .map(bf16::to_f32)
                .collect(),
        };

        let shape = IxDyn(&entry.shape);
        ArrayD::from_shape_vec(shape, values).map_err(|_| {
            ParameterLoaderError::SizeMismatch {
                data_type,
                shape: entry.shape.clone(),
                expected_size,
                actual_size: entry.size,
            }
        })
    }

    pub fn tree(&self) -> ParameterTree<'_, 'file> {
        ParameterTree {
            loader: self,
            prefix: None,
        }
    }

    fn entry(
        &self,
        key: &str,
    ) -> Result<&ParameterMetadata, ParameterLoaderError> {
        self.index
            .get(key)
            .ok_or_else(|| ParameterLoaderError::KeyNotFound(key.to_string()))
    }

    fn read_elements<T: Pod>(
        &self,
        entry: &ParameterMetadata,
        num_elements: usize,
    ) -> Result<Vec<T>, ParameterLoaderError> {
        let mut elements = vec![<T as Zeroable>::zeroed(); num_elements];
        self.file.read_exact_at(
            bytemuck::cast_slice_mut(&mut elements),
            entry.offset as u64,
        )?;
        Ok(elements)
    }
}

/// Dotted-prefix view over a [`ParameterLoader`].
pub struct ParameterTree<'loader, 'file> {
    loader: &'loader ParameterLoader<'file>,
    prefix: Option<String>,
}

impl<'loader, 'file> ParameterTree<'loader, 'file> {
    pub fn join_prefix(
        &self,
        name: &str,
    ) -> String {
        self.prefix
            .as_ref()
            .map_or_else(|| name.to_string(), |p| format!("{p}.{name}"))
    }

    pub fn subtree(
        &self,
        name: &str,
    ) -> Result<Self, ParameterLoaderError> {
        let new_prefix = self.join_prefix(name);
        let key_prefix = format!("{new_prefix}.");
        let has_children =
            self.loader.keys().any(|key| key.starts_with(&key_prefix));
        if has_children {
            Ok(Self {
                loader: self.loader,
                prefix: Some(new_prefix),
            })
        } else {
            Err(ParameterLoaderError::SubtreeNotFound(new_prefix))
        }
    }

    pub fn shape(
        &self,
        name: &str,
    ) -> Result<&'loader [usize], ParameterLoaderError> {
        self.loader.shape(&self.join_prefix(name))
    }

    pub fn leaf(
        &self,
        name: &str,
    ) -> Result<ArrayD<f32>, ParameterLoaderError> {
        self.loader.get(&self.join_prefix(name))
    }
}
