use anyhow::Result;

use super::Output;
use crate::derive::DerivedKey;
use crate::evaluate::Hit;

pub struct MultiOutput {
    outputs: Vec<Box<dyn Output>>,
}

impl MultiOutput {
    pub fn new(outputs: Vec<Box<dyn Output>>) -> Self {
        Self { outputs }
    }
}

impl Output for MultiOutput {
    fn key(&self, derived: &DerivedKey) -> Result<()> {
        for output in &self.outputs {
            output.key(derived)?;
        }
        Ok(())
    }

    fn hit(&self, hit: &Hit) -> Result<()> {
        for output in &self.outputs {
            output.hit(hit)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        for output in &self.outputs {
            output.flush()?;
        }
        Ok(())
    }
}
