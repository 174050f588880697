use super::ConstantIndex;

/// Errors that can come up when reading a class file
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// File does not start with `0xCAFEBABE`
    BadMagic(u32),

    /// Constant pool entry has a tag we don't know how to read
    UnsupportedConstantTag(u8),

    /// Constant pool index is out of range or points into the gap after a
    /// `long`/`double` entry
    MissingConstant(ConstantIndex),

    /// Constant pool entry exists but has the wrong type for the use site
    ConstantTypeMismatch {
        index: ConstantIndex,
        expected: &'static str,
    },

    /// Byte sequence is not valid modified UTF-8
    InvalidModifiedUtf8,

    /// Opcode that the JVMS does not define (or that we do not support)
    UnknownOpcode(u8),

    /// Bytecode ends in the middle of an instruction
    TruncatedCode,

    /// Class, field, or method name that violates JVMS naming rules
    MalformedName(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "i/o error: {}", err),
            Error::BadMagic(magic) => write!(f, "bad magic number {:#010x}", magic),
            Error::UnsupportedConstantTag(tag) => {
                write!(f, "unsupported constant pool tag {}", tag)
            }
            Error::MissingConstant(index) => {
                write!(f, "missing constant pool entry at {}", index.0)
            }
            Error::ConstantTypeMismatch { index, expected } => {
                write!(f, "constant pool entry {} is not a {}", index.0, expected)
            }
            Error::InvalidModifiedUtf8 => write!(f, "invalid modified UTF-8"),
            Error::UnknownOpcode(opcode) => write!(f, "unknown opcode {:#04x}", opcode),
            Error::TruncatedCode => write!(f, "truncated bytecode"),
            Error::MalformedName(name) => write!(f, "malformed name: {}", name),
        }
    }
}
