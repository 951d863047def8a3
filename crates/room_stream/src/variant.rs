use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantMapper {
    variant_count: usize,
}

impl VariantMapper {
    pub fn new(variant_count: usize) -> Result<Self, ConfigError> {
        if variant_count == 0 {
            return Err(ConfigError::NoVariants);
        }
        Ok(Self { variant_count })
    }

    pub fn variant_count(&self) -> usize {
        self.variant_count
    }

    pub fn variant_index(&self, sequence: i64) -> usize {
        (sequence.unsigned_abs() % self.variant_count as u64) as usize
    }
}

pub fn variant_index(sequence: i64, variant_count: usize) -> Result<usize, ConfigError> {
    VariantMapper::new(variant_count).map(|mapper| mapper.variant_index(sequence))
}
