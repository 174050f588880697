use crate::jvm::bytecode::{self, Instruction};
use crate::jvm::class_file::{ClassFile, Code};
use crate::jvm::{
    BinaryName, ClassAccessFlags, Error, FieldAccessFlags, Name, UnqualifiedName,
};
use elsa::FrozenMap;
use std::io::{self, BufRead};

/// Environment-provided mapping from class identifiers to raw class file bytes
///
/// This is the external resolution path: the engine never decides where class bytes come from.
/// The CLI resolves identifiers against a list of class path roots; tests resolve them from an
/// in-memory map.
pub trait ClassResolver {
    fn resolve(&self, name: &str) -> io::Result<Vec<u8>>;
}

/// Structured form of one loaded class, immutable after loading
#[derive(Debug)]
pub struct ClassRecord {
    pub name: BinaryName,
    /// Absent only for `java/lang/Object`
    pub super_name: Option<BinaryName>,
    pub interfaces: Vec<BinaryName>,
    pub is_interface: bool,
    pub fields: Vec<FieldRecord>,
    pub methods: Vec<MethodRecord>,
}

#[derive(Debug)]
pub struct FieldRecord {
    pub name: UnqualifiedName,
    pub descriptor: String,
    pub access_flags: FieldAccessFlags,
}

#[derive(Debug)]
pub struct MethodRecord {
    pub name: UnqualifiedName,
    pub descriptor: String,
    /// Decoded program-order instruction sequence; empty for methods without a `Code`
    /// attribute (abstract and native methods)
    pub instructions: Vec<Instruction>,
}

impl FieldRecord {
    pub fn is_final(&self) -> bool {
        self.access_flags.contains(FieldAccessFlags::FINAL)
    }
}

impl ClassRecord {
    /// Build a record from a parsed class file, resolving all constant pool indirections
    pub fn from_class_file(file: ClassFile) -> Result<ClassRecord, Error> {
        let constants = &file.constants;

        let make_binary_name = |raw: &str| -> Result<BinaryName, Error> {
            BinaryName::from_string(raw.to_owned()).map_err(Error::MalformedName)
        };

        let name = make_binary_name(constants.class_name(file.this_class)?)?;

        // A zero super class index is only legal for java/lang/Object
        let super_name = if file.super_class.0 .0 == 0 {
            None
        } else {
            Some(make_binary_name(constants.class_name(file.super_class)?)?)
        };

        let interfaces = file
            .interfaces
            .iter()
            .map(|index| make_binary_name(constants.class_name(*index)?))
            .collect::<Result<Vec<BinaryName>, Error>>()?;

        let fields = file
            .fields
            .iter()
            .map(|field| {
                Ok(FieldRecord {
                    name: UnqualifiedName::from_string(
                        constants.utf8(field.name_index)?.to_owned(),
                    )
                    .map_err(Error::MalformedName)?,
                    descriptor: constants.utf8(field.descriptor_index)?.to_owned(),
                    access_flags: field.access_flags,
                })
            })
            .collect::<Result<Vec<FieldRecord>, Error>>()?;

        let mut methods: Vec<MethodRecord> = vec![];
        for method in &file.methods {
            let method_name =
                UnqualifiedName::from_string(constants.utf8(method.name_index)?.to_owned())
                    .map_err(Error::MalformedName)?;
            let descriptor = constants.utf8(method.descriptor_index)?.to_owned();

            // Method keys must be unique; keep the earliest entry
            if methods
                .iter()
                .any(|m| m.name == method_name && m.descriptor == descriptor)
            {
                log::error!(
                    "[duplicate] method key not unique: {}.{}{}",
                    name,
                    method_name,
                    descriptor
                );
                continue;
            }

            let instructions = match Code::find(&method.attributes, constants)? {
                Some(code) => bytecode::decode(&code.bytecode, constants)?,
                None => vec![],
            };
            methods.push(MethodRecord {
                name: method_name,
                descriptor,
                instructions,
            });
        }

        Ok(ClassRecord {
            name,
            super_name,
            interfaces,
            is_interface: file.access_flags.contains(ClassAccessFlags::INTERFACE),
            fields,
            methods,
        })
    }

    /// Look up a declared method by (name, descriptor)
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodRecord> {
        self.methods
            .iter()
            .find(|m| m.name.as_str() == name && m.descriptor == descriptor)
    }

    /// Look up a declared field by name
    pub fn field(&self, name: &str) -> Option<&FieldRecord> {
        self.fields.iter().find(|f| f.name.as_str() == name)
    }

    /// The static initializer, if the class declares one
    pub fn initializer(&self) -> Option<&MethodRecord> {
        self.method(UnqualifiedName::CLINIT.as_str(), "()V")
    }
}

/// Whole-batch index of loaded classes
///
/// Classes are loaded once and never mutated, so the catalog hands out references that stay
/// valid while more classes are loaded lazily mid-analysis (append-once map, get-or-insert-once
/// contract).
pub struct ClassCatalog<R> {
    resolver: R,
    classes: FrozenMap<String, Box<ClassRecord>>,
}

impl<R: ClassResolver> ClassCatalog<R> {
    pub fn new(resolver: R) -> ClassCatalog<R> {
        ClassCatalog {
            resolver,
            classes: FrozenMap::new(),
        }
    }

    /// Look up an already-loaded class
    pub fn lookup_class(&self, name: &str) -> Option<&ClassRecord> {
        self.classes.get(name)
    }

    /// Look up a method by its (class, name, descriptor) key among loaded classes
    pub fn lookup_method(
        &self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Option<&MethodRecord> {
        self.lookup_class(class)
            .and_then(|record| record.method(name, descriptor))
    }

    /// Load a class by identifier, or return it if already loaded
    ///
    /// Resolution and parse failures are logged and leave the class unindexed; the caller sees
    /// `None` and treats the reference as an internal error. The record registers under its
    /// *parsed* name; the return value is the lookup of the *requested* name, so an identifier
    /// that resolves to a differently-named class yields `None`.
    pub fn load(&self, name: &str) -> Option<&ClassRecord> {
        if let Some(record) = self.classes.get(name) {
            return Some(record);
        }

        let bytes = match self.resolver.resolve(name) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("[load] cannot resolve class {}: {}", name, err);
                return None;
            }
        };

        let record = ClassFile::parse(&bytes)
            .and_then(ClassRecord::from_class_file)
            .map_err(|err| log::error!("[load] cannot parse class {}: {}", name, err))
            .ok()?;

        if self.classes.get(record.name.as_str()).is_some() {
            // First registration wins
            log::error!("[duplicate] class name not unique: {}", record.name);
        } else {
            log::debug!("[load] registered {}", record.name);
            self.classes
                .insert(record.name.as_str().to_owned(), Box::new(record));
        }

        self.classes.get(name)
    }

    /// Read a newline-delimited list of class identifiers, load each, and return the ordered
    /// set of top-level classes to classify
    ///
    /// Repeated identifiers are a logged, non-fatal error (the first entry wins). Identifiers
    /// that fail to load are skipped; classes loaded transitively while resolving call and
    /// field targets are *not* part of the returned set.
    pub fn load_batch(&self, reader: impl BufRead) -> io::Result<Vec<String>> {
        let mut targets: Vec<String> = vec![];
        for line in reader.lines() {
            let line = line?;
            let name = line.trim();
            if name.is_empty() {
                continue;
            }
            if targets.iter().any(|t| t == name) {
                log::error!("[duplicate] class listed twice: {}", name);
                continue;
            }
            if self.load(name).is_some() {
                targets.push(name.to_owned());
            }
        }
        Ok(targets)
    }

    /// File-backed convenience wrapper around [`Self::load_batch`]
    pub fn load_batch_path(&self, path: impl AsRef<std::path::Path>) -> io::Result<Vec<String>> {
        let file = std::fs::File::open(path)?;
        self.load_batch(io::BufReader::new(file))
    }
}
