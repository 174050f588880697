use crate::jvm::class_file::{ConstantPool, Deserialize, Utf8ConstantIndex};
use crate::jvm::Error;
use byteorder::ReadBytesExt;

/// Attributes (used in classes, fields, methods, and even on some attributes)
///
/// Attribute payloads are kept as raw bytes; only the attributes the analysis needs are parsed
/// further (see [`Code`]).
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7
#[derive(Debug)]
pub struct Attribute {
    pub name_index: Utf8ConstantIndex,
    pub info: Vec<u8>,
}

impl Deserialize for Attribute {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let name_index = Utf8ConstantIndex::deserialize(reader)?;

        // Attribute info length is 4 bytes
        let length = u32::deserialize(reader)?;
        let mut info = vec![0u8; length as usize];
        reader.read_exact(&mut info)?;

        Ok(Attribute { name_index, info })
    }
}

/// The parts of a `Code` attribute the analysis consumes
///
/// The exception table and nested attributes (line numbers, stack map frames) are skipped: the
/// safety policy treats `athrow` as terminal, so handler ranges never matter.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.3
#[derive(Debug)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub bytecode: Vec<u8>,
}

impl Code {
    /// Name of the attribute
    pub const NAME: &'static str = "Code";

    /// Extract the code attribute from a method's attribute list, if present
    pub fn find(attributes: &[Attribute], constants: &ConstantPool) -> Result<Option<Code>, Error> {
        for attribute in attributes {
            if constants.utf8(attribute.name_index)? == Code::NAME {
                let mut reader: &[u8] = &attribute.info;
                return Ok(Some(Code::deserialize(&mut reader)?));
            }
        }
        Ok(None)
    }
}

impl Deserialize for Code {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let max_stack = u16::deserialize(reader)?;
        let max_locals = u16::deserialize(reader)?;

        // Code length is 4 bytes
        let code_length = u32::deserialize(reader)?;
        let mut bytecode = vec![0u8; code_length as usize];
        reader.read_exact(&mut bytecode)?;

        // Exception table entries are 4 `u16`s each
        let exception_table_length = u16::deserialize(reader)?;
        for _ in 0..exception_table_length {
            for _ in 0..4 {
                u16::deserialize(reader)?;
            }
        }

        let _attributes = Vec::<Attribute>::deserialize(reader)?;

        Ok(Code {
            max_stack,
            max_locals,
            bytecode,
        })
    }
}
