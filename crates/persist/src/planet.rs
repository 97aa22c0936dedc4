use std::io::{Read, Write};

use worldsim_common::{Index3, UniverseId};

use crate::binary::{BinaryReader, BinarySerializable, BinaryWriter};
use crate::definitions::DefinitionLookup;
use crate::error::PersistError;

/// Encoded size of a planet record in bytes.
pub const PLANET_RECORD_LEN: usize = 4 + 4 + 4 + 3 * 4 + 16;

/// Largest size exponent whose power of two fits a signed 32-bit extent.
const MAX_SIZE_EXPONENT: i32 = 30;

/// A persisted planet: identity, seed, gravity and extent in chunks.
///
/// [`Planet::new`] takes the extent as base-2 exponents and stores the
/// expanded sizes. The binary record stores the expanded sizes verbatim and
/// `deserialize` reads them back without any exponentiation. `Default` is the
/// blank instance that `deserialize` populates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Planet {
    pub id: i32,
    pub universe: UniverseId,
    pub seed: i32,
    /// Chunk count per axis, always a power of two.
    pub size: Index3,
    pub gravity: f32,
}

impl Planet {
    /// Create a planet whose size is `2^exponent` chunks on each axis.
    pub fn new(
        id: i32,
        universe: UniverseId,
        size_exponents: Index3,
        seed: i32,
    ) -> Result<Self, PersistError> {
        let size = Index3::new(
            pow2('x', size_exponents.x)?,
            pow2('y', size_exponents.y)?,
            pow2('z', size_exponents.z)?,
        );
        Ok(Self {
            id,
            universe,
            seed,
            size,
            gravity: 0.0,
        })
    }

    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }
}

fn pow2(axis: char, exponent: i32) -> Result<i32, PersistError> {
    if !(0..=MAX_SIZE_EXPONENT).contains(&exponent) {
        return Err(PersistError::InvalidExtent { axis, exponent });
    }
    Ok(1 << exponent)
}

impl BinarySerializable for Planet {
    fn serialize<W: Write>(
        &self,
        writer: &mut BinaryWriter<W>,
        _definitions: &dyn DefinitionLookup,
    ) -> Result<(), PersistError> {
        writer.write_i32(self.id)?;
        writer.write_i32(self.seed)?;
        writer.write_f32(self.gravity)?;
        writer.write_i32(self.size.x)?;
        writer.write_i32(self.size.y)?;
        writer.write_i32(self.size.z)?;
        writer.write_uuid(&self.universe.0)?;
        // no name field; the record ends with the universe id
        Ok(())
    }

    fn deserialize<R: Read>(
        &mut self,
        reader: &mut BinaryReader<R>,
        _definitions: &dyn DefinitionLookup,
    ) -> Result<(), PersistError> {
        self.id = reader.read_i32()?;
        self.seed = reader.read_i32()?;
        self.gravity = reader.read_f32()?;
        let x = reader.read_i32()?;
        let y = reader.read_i32()?;
        let z = reader.read_i32()?;
        self.size = Index3::new(x, y, z);
        self.universe = UniverseId(reader.read_uuid()?);
        Ok(())
    }
}
