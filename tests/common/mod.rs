//! Test support: assemble small class files in memory and resolve them from a map

use clinitcheck::analysis::{
    ClassCatalog, ClassResolver, Classification, Settings, Solver,
};
use std::collections::HashMap;
use std::io;

pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;

/// Symbolic instruction, resolved against the constant pool at assembly time
pub enum Op {
    GetStatic(&'static str, &'static str, &'static str),
    PutStatic(&'static str, &'static str, &'static str),
    GetField(&'static str, &'static str, &'static str),
    InvokeVirtual(&'static str, &'static str, &'static str),
    InvokeSpecial(&'static str, &'static str, &'static str),
    InvokeStatic(&'static str, &'static str, &'static str),
    InvokeInterface(&'static str, &'static str, &'static str),
    InvokeDynamic,
    Athrow,
    Return,
    Raw(u8),
}

/// Interning constant pool builder (no two-slot constants, so indices are sequential)
#[derive(Default)]
struct PoolBuilder {
    bytes: Vec<u8>,
    count: u16,
    utf8s: HashMap<String, u16>,
    classes: HashMap<String, u16>,
    name_and_types: HashMap<(u16, u16), u16>,
    members: HashMap<(u8, u16, u16), u16>,
}

impl PoolBuilder {
    fn next(&mut self) -> u16 {
        self.count += 1;
        self.count
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(&index) = self.utf8s.get(value) {
            return index;
        }
        let index = self.next();
        self.bytes.push(1);
        self.bytes
            .extend_from_slice(&(value.len() as u16).to_be_bytes());
        self.bytes.extend_from_slice(value.as_bytes());
        self.utf8s.insert(value.to_owned(), index);
        index
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(&index) = self.classes.get(name) {
            return index;
        }
        let name_index = self.utf8(name);
        let index = self.next();
        self.bytes.push(7);
        self.bytes.extend_from_slice(&name_index.to_be_bytes());
        self.classes.insert(name.to_owned(), index);
        index
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        if let Some(&index) = self.name_and_types.get(&(name_index, descriptor_index)) {
            return index;
        }
        let index = self.next();
        self.bytes.push(12);
        self.bytes.extend_from_slice(&name_index.to_be_bytes());
        self.bytes.extend_from_slice(&descriptor_index.to_be_bytes());
        self.name_and_types
            .insert((name_index, descriptor_index), index);
        index
    }

    /// `tag` is 9 (field), 10 (method), or 11 (interface method)
    fn member(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let nat_index = self.name_and_type(name, descriptor);
        if let Some(&index) = self.members.get(&(tag, class_index, nat_index)) {
            return index;
        }
        let index = self.next();
        self.bytes.push(tag);
        self.bytes.extend_from_slice(&class_index.to_be_bytes());
        self.bytes.extend_from_slice(&nat_index.to_be_bytes());
        self.members.insert((tag, class_index, nat_index), index);
        index
    }
}

struct MethodSpec {
    name: &'static str,
    descriptor: &'static str,
    code: Vec<Op>,
}

/// Assembles one class file from the top down
pub struct ClassBuilder {
    name: String,
    super_name: Option<String>,
    access_flags: u16,
    interfaces: Vec<String>,
    fields: Vec<(&'static str, &'static str, u16)>,
    methods: Vec<MethodSpec>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> ClassBuilder {
        ClassBuilder {
            name: name.to_owned(),
            super_name: None,
            access_flags: 0x0021, // ACC_PUBLIC | ACC_SUPER
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
        }
    }

    pub fn super_class(mut self, name: &str) -> ClassBuilder {
        self.super_name = Some(name.to_owned());
        self
    }

    pub fn as_interface(mut self) -> ClassBuilder {
        self.access_flags = 0x0601; // ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT
        self
    }

    pub fn interface(mut self, name: &str) -> ClassBuilder {
        self.interfaces.push(name.to_owned());
        self
    }

    pub fn field(
        mut self,
        name: &'static str,
        descriptor: &'static str,
        access_flags: u16,
    ) -> ClassBuilder {
        self.fields.push((name, descriptor, access_flags));
        self
    }

    pub fn method(
        mut self,
        name: &'static str,
        descriptor: &'static str,
        code: Vec<Op>,
    ) -> ClassBuilder {
        self.methods.push(MethodSpec {
            name,
            descriptor,
            code,
        });
        self
    }

    pub fn initializer(self, code: Vec<Op>) -> ClassBuilder {
        self.method("<clinit>", "()V", code)
    }

    pub fn build(self) -> Vec<u8> {
        let mut pool = PoolBuilder::default();
        let this_index = pool.class(&self.name);
        let super_index = match &self.super_name {
            Some(name) => pool.class(name),
            None => 0,
        };
        let interface_indices: Vec<u16> = self
            .interfaces
            .iter()
            .map(|name| pool.class(name))
            .collect();
        let field_indices: Vec<(u16, u16, u16)> = self
            .fields
            .iter()
            .map(|(name, descriptor, access)| (pool.utf8(name), pool.utf8(descriptor), *access))
            .collect();

        let code_attribute_name = pool.utf8("Code");
        let method_parts: Vec<(u16, u16, Vec<u8>)> = self
            .methods
            .iter()
            .map(|method| {
                (
                    pool.utf8(method.name),
                    pool.utf8(method.descriptor),
                    assemble(&method.code, &mut pool),
                )
            })
            .collect();

        let mut bytes: Vec<u8> = vec![];
        bytes.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes()); // minor
        bytes.extend_from_slice(&52u16.to_be_bytes()); // major (Java 8)

        bytes.extend_from_slice(&(pool.count + 1).to_be_bytes());
        bytes.extend_from_slice(&pool.bytes);

        bytes.extend_from_slice(&self.access_flags.to_be_bytes());
        bytes.extend_from_slice(&this_index.to_be_bytes());
        bytes.extend_from_slice(&super_index.to_be_bytes());

        bytes.extend_from_slice(&(interface_indices.len() as u16).to_be_bytes());
        for index in interface_indices {
            bytes.extend_from_slice(&index.to_be_bytes());
        }

        bytes.extend_from_slice(&(field_indices.len() as u16).to_be_bytes());
        for (name_index, descriptor_index, access) in field_indices {
            bytes.extend_from_slice(&access.to_be_bytes());
            bytes.extend_from_slice(&name_index.to_be_bytes());
            bytes.extend_from_slice(&descriptor_index.to_be_bytes());
            bytes.extend_from_slice(&0u16.to_be_bytes()); // no attributes
        }

        bytes.extend_from_slice(&(method_parts.len() as u16).to_be_bytes());
        for (name_index, descriptor_index, code) in method_parts {
            bytes.extend_from_slice(&0x0009u16.to_be_bytes()); // ACC_PUBLIC | ACC_STATIC
            bytes.extend_from_slice(&name_index.to_be_bytes());
            bytes.extend_from_slice(&descriptor_index.to_be_bytes());
            bytes.extend_from_slice(&1u16.to_be_bytes()); // one attribute: Code

            bytes.extend_from_slice(&code_attribute_name.to_be_bytes());
            let attribute_length = 2 + 2 + 4 + code.len() as u32 + 2 + 2;
            bytes.extend_from_slice(&attribute_length.to_be_bytes());
            bytes.extend_from_slice(&8u16.to_be_bytes()); // max_stack
            bytes.extend_from_slice(&8u16.to_be_bytes()); // max_locals
            bytes.extend_from_slice(&(code.len() as u32).to_be_bytes());
            bytes.extend_from_slice(&code);
            bytes.extend_from_slice(&0u16.to_be_bytes()); // empty exception table
            bytes.extend_from_slice(&0u16.to_be_bytes()); // no nested attributes
        }

        bytes.extend_from_slice(&0u16.to_be_bytes()); // no class attributes
        bytes
    }
}

fn assemble(code: &[Op], pool: &mut PoolBuilder) -> Vec<u8> {
    let mut bytes: Vec<u8> = vec![];
    for op in code {
        match op {
            Op::GetStatic(owner, name, descriptor) => {
                bytes.push(0xb2);
                bytes.extend_from_slice(&pool.member(9, owner, name, descriptor).to_be_bytes());
            }
            Op::PutStatic(owner, name, descriptor) => {
                bytes.push(0xb3);
                bytes.extend_from_slice(&pool.member(9, owner, name, descriptor).to_be_bytes());
            }
            Op::GetField(owner, name, descriptor) => {
                bytes.push(0xb4);
                bytes.extend_from_slice(&pool.member(9, owner, name, descriptor).to_be_bytes());
            }
            Op::InvokeVirtual(owner, name, descriptor) => {
                bytes.push(0xb6);
                bytes.extend_from_slice(&pool.member(10, owner, name, descriptor).to_be_bytes());
            }
            Op::InvokeSpecial(owner, name, descriptor) => {
                bytes.push(0xb7);
                bytes.extend_from_slice(&pool.member(10, owner, name, descriptor).to_be_bytes());
            }
            Op::InvokeStatic(owner, name, descriptor) => {
                bytes.push(0xb8);
                bytes.extend_from_slice(&pool.member(10, owner, name, descriptor).to_be_bytes());
            }
            Op::InvokeInterface(owner, name, descriptor) => {
                bytes.push(0xb9);
                bytes.extend_from_slice(&pool.member(11, owner, name, descriptor).to_be_bytes());
                bytes.push(1); // count
                bytes.push(0);
            }
            Op::InvokeDynamic => {
                bytes.extend_from_slice(&[0xba, 0x00, 0x01, 0x00, 0x00]);
            }
            Op::Athrow => bytes.push(0xbf),
            Op::Return => bytes.push(0xb1),
            Op::Raw(opcode) => bytes.push(*opcode),
        }
    }
    bytes
}

/// Resolves class bytes from an in-memory map
pub struct MapResolver(pub HashMap<String, Vec<u8>>);

impl ClassResolver for MapResolver {
    fn resolve(&self, name: &str) -> io::Result<Vec<u8>> {
        self.0.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such class: {}", name))
        })
    }
}

/// Load `targets` from `classes` (newline-batch path, as the CLI does) and classify them
pub fn classify(
    classes: HashMap<String, Vec<u8>>,
    settings: &Settings,
    targets: &[&str],
) -> Classification {
    let catalog = ClassCatalog::new(MapResolver(classes));
    let batch = catalog
        .load_batch(io::Cursor::new(targets.join("\n")))
        .unwrap();
    Solver::new(&catalog, settings).classify(&batch)
}

/// Shorthand for building the class byte map
pub fn class_map(classes: Vec<(&str, Vec<u8>)>) -> HashMap<String, Vec<u8>> {
    classes
        .into_iter()
        .map(|(name, bytes)| (name.to_owned(), bytes))
        .collect()
}
