#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub enum DataType {
    BF16,
    F16,
    F32,
    F64,
}

impl DataType {
    pub fn size_in_bits(&self) -> usize {
        match self {
            DataType::BF16 => 16,
            DataType::F16 => 16,
            DataType::F32 => 32,
            DataType::F64 => 64,
        }
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bits().div_ceil(8)
    }
}
