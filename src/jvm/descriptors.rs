use std::io::{Error, ErrorKind, Result};
use std::iter::Peekable;
use std::str::Chars;

pub trait ParseDescriptor: Sized {
    /// Parse a descriptor from a string
    fn parse(source: &str) -> Result<Self> {
        let mut chars = source.chars().peekable();
        let ret = Self::parse_from(&mut chars)?;
        match chars.next() {
            None => Ok(ret),
            Some(c) => {
                let msg = format!("Unexpected leftover input '{}'", c);
                Err(Error::new(ErrorKind::InvalidInput, msg))
            }
        }
    }

    /// Read the descriptor from a character buffer
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self>;
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl ParseDescriptor for BaseType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        let typ = match source.next() {
            Some('B') => BaseType::Byte,
            Some('C') => BaseType::Char,
            Some('D') => BaseType::Double,
            Some('F') => BaseType::Float,
            Some('I') => BaseType::Int,
            Some('J') => BaseType::Long,
            Some('S') => BaseType::Short,
            Some('Z') => BaseType::Boolean,
            Some(c) => {
                let msg = format!("Invalid base type character '{}'", c);
                return Err(Error::new(ErrorKind::InvalidInput, msg));
            }
            None => {
                let msg = "Missing base type character";
                return Err(Error::new(ErrorKind::UnexpectedEof, msg));
            }
        };
        Ok(typ)
    }
}

/// Type of a field, as it appears in a field descriptor
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.3.2>
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType {
    Base(BaseType),
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Is this a primitive (non-reference) type?
    pub fn is_primitive(&self) -> bool {
        matches!(self, FieldType::Base(_))
    }
}

impl ParseDescriptor for FieldType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        match source.peek() {
            Some('L') => {
                source.next();
                let mut class_name = String::new();
                loop {
                    match source.next() {
                        Some(';') => break,
                        Some(c) => class_name.push(c),
                        None => {
                            let msg = "Missing ';' at the end of an object descriptor";
                            return Err(Error::new(ErrorKind::UnexpectedEof, msg));
                        }
                    }
                }
                Ok(FieldType::Object(class_name))
            }
            Some('[') => {
                source.next();
                let element = FieldType::parse_from(source)?;
                Ok(FieldType::Array(Box::new(element)))
            }
            _ => Ok(FieldType::Base(BaseType::parse_from(source)?)),
        }
    }
}

#[cfg(test)]
mod descriptor_tests {
    use super::*;

    #[test]
    fn primitive_descriptors() {
        assert_eq!(FieldType::parse("I").unwrap(), FieldType::Base(BaseType::Int));
        assert_eq!(FieldType::parse("J").unwrap(), FieldType::Base(BaseType::Long));
        assert!(FieldType::parse("I").unwrap().is_primitive());
    }

    #[test]
    fn object_descriptor() {
        let parsed = FieldType::parse("Ljava/lang/String;").unwrap();
        assert_eq!(parsed, FieldType::Object(String::from("java/lang/String")));
        assert!(!parsed.is_primitive());
    }

    #[test]
    fn array_descriptors() {
        let ints = FieldType::parse("[I").unwrap();
        assert_eq!(ints, FieldType::Array(Box::new(FieldType::Base(BaseType::Int))));
        assert!(!ints.is_primitive());

        let strings = FieldType::parse("[[Ljava/lang/String;").unwrap();
        assert!(matches!(strings, FieldType::Array(_)));
    }

    #[test]
    fn malformed_descriptors() {
        assert!(FieldType::parse("").is_err());
        assert!(FieldType::parse("Q").is_err());
        assert!(FieldType::parse("Ljava/lang/String").is_err());
        assert!(FieldType::parse("II").is_err());
    }
}
