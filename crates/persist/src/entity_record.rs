//! Binary record for kernel entities.
//!
//! Layout: id (i32), definition index (u16), position xyz, rotation xyzw and
//! scale xyz (f32 each). The simulation binding and behavior are not stored.

use std::io::{Read, Write};

use glam::{Quat, Vec3};
use worldsim_common::{EntityId, Transform};
use worldsim_kernel::Entity;

use crate::binary::{BinaryReader, BinarySerializable, BinaryWriter};
use crate::definitions::DefinitionLookup;
use crate::error::PersistError;

pub const ENTITY_RECORD_LEN: usize = 4 + 2 + 10 * 4;

impl BinarySerializable for Entity {
    fn serialize<W: Write>(
        &self,
        writer: &mut BinaryWriter<W>,
        definitions: &dyn DefinitionLookup,
    ) -> Result<(), PersistError> {
        let index = definitions
            .index_of(self.definition())
            .ok_or_else(|| PersistError::UnknownDefinition(self.definition().to_string()))?;
        writer.write_i32(self.id().0)?;
        writer.write_u16(index)?;
        write_transform(writer, &self.transform)?;
        Ok(())
    }

    fn deserialize<R: Read>(
        &mut self,
        reader: &mut BinaryReader<R>,
        definitions: &dyn DefinitionLookup,
    ) -> Result<(), PersistError> {
        self.set_id(EntityId(reader.read_i32()?));
        let index = reader.read_u16()?;
        let name = definitions
            .name_of(index)
            .ok_or(PersistError::UnknownDefinitionIndex(index))?;
        self.set_definition(name);
        self.transform = read_transform(reader)?;
        Ok(())
    }
}

fn write_transform<W: Write>(
    writer: &mut BinaryWriter<W>,
    transform: &Transform,
) -> std::io::Result<()> {
    let floats = transform
        .position
        .to_array()
        .into_iter()
        .chain(transform.rotation.to_array())
        .chain(transform.scale.to_array());
    for value in floats {
        writer.write_f32(value)?;
    }
    Ok(())
}

fn read_transform<R: Read>(reader: &mut BinaryReader<R>) -> std::io::Result<Transform> {
    let mut floats = [0f32; 10];
    for value in &mut floats {
        *value = reader.read_f32()?;
    }
    Ok(Transform {
        position: Vec3::new(floats[0], floats[1], floats[2]),
        rotation: Quat::from_xyzw(floats[3], floats[4], floats[5], floats[6]),
        scale: Vec3::new(floats[7], floats[8], floats[9]),
    })
}
