use crate::jvm::class_file::Deserialize;
use crate::jvm::Error;
use byteorder::ReadBytesExt;

/// Class file version
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.1-200-B.2
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Version {
    pub minor: u16,
    pub major: u16,
}

impl Deserialize for Version {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let minor = u16::deserialize(reader)?;
        let major = u16::deserialize(reader)?;
        Ok(Version { minor, major })
    }
}
