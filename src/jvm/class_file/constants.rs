use crate::jvm::class_file::Deserialize;
use crate::jvm::Error;
use byteorder::ReadBytesExt;

/// Index into the constant pool
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ConstantIndex(pub u16);

/// Index into the constant pool that is known to point at a `Constant::Utf8`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Utf8ConstantIndex(pub ConstantIndex);

/// Index into the constant pool that is known to point at a `Constant::Class`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ClassConstantIndex(pub ConstantIndex);

/// Index into the constant pool that is known to point at a `Constant::NameAndType`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NameAndTypeConstantIndex(pub ConstantIndex);

impl Deserialize for ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(ConstantIndex(u16::deserialize(reader)?))
    }
}

impl Deserialize for Utf8ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(Utf8ConstantIndex(ConstantIndex::deserialize(reader)?))
    }
}

impl Deserialize for ClassConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(ClassConstantIndex(ConstantIndex::deserialize(reader)?))
    }
}

impl Deserialize for NameAndTypeConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        Ok(NameAndTypeConstantIndex(ConstantIndex::deserialize(
            reader,
        )?))
    }
}

/// Constants as in the constant pool
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method (this combines `Methodref` and `InterfaceMethodref`)
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`
    Float(f32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`
    Double(f64),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(String),

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        handle_kind: u8,
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed constant
    Dynamic {
        bootstrap_method: u16,
        field_descriptor: NameAndTypeConstantIndex,
    },

    /// Dynamically-computed call site
    InvokeDynamic {
        bootstrap_method: u16,
        method_descriptor: NameAndTypeConstantIndex,
    },

    /// Module (Java 9+)
    Module(Utf8ConstantIndex),

    /// Package (Java 9+)
    Package(Utf8ConstantIndex),
}

/// Owner, name, and descriptor of a field or method reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// Read-side view of a class file's constant pool
///
/// Indexing starts at 1 and `long`/`double` constants occupy two slots, so the pool is stored
/// with explicit gaps.
#[derive(Debug)]
pub struct ConstantPool {
    constants: Vec<Option<Constant>>,
}

impl Deserialize for ConstantPool {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self, Error> {
        let count = u16::deserialize(reader)?;
        let mut constants: Vec<Option<Constant>> = Vec::with_capacity(count as usize);
        constants.push(None); // index 0 is unused

        while constants.len() < count as usize {
            let constant = match u8::deserialize(reader)? {
                1 => {
                    let length = u16::deserialize(reader)?;
                    let mut buffer = vec![0u8; length as usize];
                    reader.read_exact(&mut buffer)?;
                    Constant::Utf8(decode_modified_utf8(&buffer)?)
                }
                3 => Constant::Integer(i32::deserialize(reader)?),
                4 => Constant::Float(f32::deserialize(reader)?),
                5 => Constant::Long(i64::deserialize(reader)?),
                6 => Constant::Double(f64::deserialize(reader)?),
                7 => Constant::Class(Utf8ConstantIndex::deserialize(reader)?),
                8 => Constant::String(Utf8ConstantIndex::deserialize(reader)?),
                9 => Constant::FieldRef(
                    ClassConstantIndex::deserialize(reader)?,
                    NameAndTypeConstantIndex::deserialize(reader)?,
                ),
                tag @ (10 | 11) => Constant::MethodRef {
                    class: ClassConstantIndex::deserialize(reader)?,
                    name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
                    is_interface: tag == 11,
                },
                12 => Constant::NameAndType {
                    name: Utf8ConstantIndex::deserialize(reader)?,
                    descriptor: Utf8ConstantIndex::deserialize(reader)?,
                },
                15 => Constant::MethodHandle {
                    handle_kind: u8::deserialize(reader)?,
                    member: ConstantIndex::deserialize(reader)?,
                },
                16 => Constant::MethodType {
                    descriptor: Utf8ConstantIndex::deserialize(reader)?,
                },
                17 => Constant::Dynamic {
                    bootstrap_method: u16::deserialize(reader)?,
                    field_descriptor: NameAndTypeConstantIndex::deserialize(reader)?,
                },
                18 => Constant::InvokeDynamic {
                    bootstrap_method: u16::deserialize(reader)?,
                    method_descriptor: NameAndTypeConstantIndex::deserialize(reader)?,
                },
                19 => Constant::Module(Utf8ConstantIndex::deserialize(reader)?),
                20 => Constant::Package(Utf8ConstantIndex::deserialize(reader)?),
                tag => return Err(Error::UnsupportedConstantTag(tag)),
            };

            // `long` and `double` constants take two slots
            let two_slots = matches!(constant, Constant::Long(_) | Constant::Double(_));
            constants.push(Some(constant));
            if two_slots {
                constants.push(None);
            }
        }

        Ok(ConstantPool { constants })
    }
}

impl ConstantPool {
    /// Look up any constant
    pub fn get(&self, index: ConstantIndex) -> Result<&Constant, Error> {
        self.constants
            .get(index.0 as usize)
            .and_then(|slot| slot.as_ref())
            .ok_or(Error::MissingConstant(index))
    }

    /// Look up a UTF-8 constant
    pub fn utf8(&self, index: Utf8ConstantIndex) -> Result<&str, Error> {
        match self.get(index.0)? {
            Constant::Utf8(string) => Ok(string),
            _ => Err(Error::ConstantTypeMismatch {
                index: index.0,
                expected: "Utf8",
            }),
        }
    }

    /// Look up a class constant and resolve it to the class's binary name
    pub fn class_name(&self, index: ClassConstantIndex) -> Result<&str, Error> {
        match self.get(index.0)? {
            Constant::Class(name) => self.utf8(*name),
            _ => Err(Error::ConstantTypeMismatch {
                index: index.0,
                expected: "Class",
            }),
        }
    }

    fn name_and_type(&self, index: NameAndTypeConstantIndex) -> Result<(&str, &str), Error> {
        match self.get(index.0)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(Error::ConstantTypeMismatch {
                index: index.0,
                expected: "NameAndType",
            }),
        }
    }

    /// Look up a field reference and resolve owner, name, and descriptor
    pub fn field_ref(&self, index: ConstantIndex) -> Result<MemberRef, Error> {
        match self.get(index)? {
            Constant::FieldRef(class, name_and_type) => {
                let owner = self.class_name(*class)?;
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok(MemberRef {
                    owner,
                    name,
                    descriptor,
                })
            }
            _ => Err(Error::ConstantTypeMismatch {
                index,
                expected: "Fieldref",
            }),
        }
    }

    /// Look up a method reference (plain or interface) and resolve owner, name, and descriptor
    pub fn method_ref(&self, index: ConstantIndex) -> Result<MemberRef, Error> {
        match self.get(index)? {
            Constant::MethodRef {
                class,
                name_and_type,
                ..
            } => {
                let owner = self.class_name(*class)?;
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok(MemberRef {
                    owner,
                    name,
                    descriptor,
                })
            }
            _ => Err(Error::ConstantTypeMismatch {
                index,
                expected: "Methodref",
            }),
        }
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u{0000}` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String, Error> {
    let mut string = String::with_capacity(bytes.len());
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());

    // First decode into UTF-16 code units (the 6-byte supplementary encoding is literally a
    // surrogate pair of 3-byte encodings)
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 & 0b1000_0000 == 0 {
            if b0 == 0 {
                return Err(Error::InvalidModifiedUtf8);
            }
            units.push(b0 as u16);
            i += 1;
        } else if b0 & 0b1110_0000 == 0b1100_0000 {
            let b1 = *bytes.get(i + 1).ok_or(Error::InvalidModifiedUtf8)?;
            if b1 & 0b1100_0000 != 0b1000_0000 {
                return Err(Error::InvalidModifiedUtf8);
            }
            units.push(((b0 as u16 & 0x1F) << 6) | (b1 as u16 & 0x3F));
            i += 2;
        } else if b0 & 0b1111_0000 == 0b1110_0000 {
            let b1 = *bytes.get(i + 1).ok_or(Error::InvalidModifiedUtf8)?;
            let b2 = *bytes.get(i + 2).ok_or(Error::InvalidModifiedUtf8)?;
            if b1 & 0b1100_0000 != 0b1000_0000 || b2 & 0b1100_0000 != 0b1000_0000 {
                return Err(Error::InvalidModifiedUtf8);
            }
            units.push(((b0 as u16 & 0x0F) << 12) | ((b1 as u16 & 0x3F) << 6) | (b2 as u16 & 0x3F));
            i += 3;
        } else {
            return Err(Error::InvalidModifiedUtf8);
        }
    }

    // Then combine surrogate pairs
    let mut units = units.into_iter().peekable();
    while let Some(unit) = units.next() {
        let c = if (0xD800..=0xDBFF).contains(&unit) {
            let low = match units.peek() {
                Some(low) if (0xDC00..=0xDFFF).contains(low) => *low,
                _ => return Err(Error::InvalidModifiedUtf8),
            };
            units.next();
            let code =
                0x10000 + (((unit as u32 - 0xD800) << 10) | (low as u32 - 0xDC00));
            char::from_u32(code).ok_or(Error::InvalidModifiedUtf8)?
        } else if (0xDC00..=0xDFFF).contains(&unit) {
            return Err(Error::InvalidModifiedUtf8);
        } else {
            char::from_u32(unit as u32).ok_or(Error::InvalidModifiedUtf8)?
        };
        string.push(c);
    }

    Ok(string)
}
