//! Decoding of method bytecode into the instruction stream the analysis consumes
//!
//! Only field accesses, invokes, `invokedynamic`, and `athrow` carry information the safety
//! policy looks at; every other instruction is kept as an opaque [`Instruction::Other`] so that
//! program order is preserved. Operand skipping still has to be exact (including the 4-byte
//! alignment padding of `tableswitch`/`lookupswitch` and the `wide` prefix), otherwise the
//! decoder would desynchronize from the instruction stream.

use crate::jvm::class_file::{ConstantIndex, ConstantPool};
use crate::jvm::Error;

/// Direction and addressing mode of a field access
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    GetField,
    PutField,
    GetStatic,
    PutStatic,
}

/// Dispatch mode of a method call
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

/// One decoded instruction
///
/// Owners are raw constant pool strings (they may name array classes like `[I`, which are valid
/// reference targets but not valid declared class names).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Field {
        kind: FieldKind,
        owner: String,
        name: String,
        descriptor: String,
    },
    Invoke {
        kind: InvokeKind,
        owner: String,
        name: String,
        descriptor: String,
    },
    InvokeDynamic,
    Throw,
    Other(u8),
}

const GETSTATIC: u8 = 0xb2;
const PUTSTATIC: u8 = 0xb3;
const GETFIELD: u8 = 0xb4;
const PUTFIELD: u8 = 0xb5;
const INVOKEVIRTUAL: u8 = 0xb6;
const INVOKESPECIAL: u8 = 0xb7;
const INVOKESTATIC: u8 = 0xb8;
const INVOKEINTERFACE: u8 = 0xb9;
const INVOKEDYNAMIC: u8 = 0xba;
const ATHROW: u8 = 0xbf;
const TABLESWITCH: u8 = 0xaa;
const LOOKUPSWITCH: u8 = 0xab;
const WIDE: u8 = 0xc4;
const IINC: u8 = 0x84;

/// Decode a `Code` attribute's bytecode into program-order instructions
pub fn decode(bytecode: &[u8], constants: &ConstantPool) -> Result<Vec<Instruction>, Error> {
    let mut instructions = vec![];
    let mut pc: usize = 0;

    while pc < bytecode.len() {
        let opcode = bytecode[pc];
        match opcode {
            GETSTATIC | PUTSTATIC | GETFIELD | PUTFIELD => {
                let member = constants.field_ref(read_index(bytecode, pc + 1)?)?;
                let kind = match opcode {
                    GETSTATIC => FieldKind::GetStatic,
                    PUTSTATIC => FieldKind::PutStatic,
                    GETFIELD => FieldKind::GetField,
                    _ => FieldKind::PutField,
                };
                instructions.push(Instruction::Field {
                    kind,
                    owner: member.owner.to_owned(),
                    name: member.name.to_owned(),
                    descriptor: member.descriptor.to_owned(),
                });
                pc += 3;
            }

            INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC => {
                let member = constants.method_ref(read_index(bytecode, pc + 1)?)?;
                let kind = match opcode {
                    INVOKEVIRTUAL => InvokeKind::Virtual,
                    INVOKESPECIAL => InvokeKind::Special,
                    _ => InvokeKind::Static,
                };
                instructions.push(Instruction::Invoke {
                    kind,
                    owner: member.owner.to_owned(),
                    name: member.name.to_owned(),
                    descriptor: member.descriptor.to_owned(),
                });
                pc += 3;
            }

            // `invokeinterface` carries a count byte and a zero byte after the index
            INVOKEINTERFACE => {
                let member = constants.method_ref(read_index(bytecode, pc + 1)?)?;
                instructions.push(Instruction::Invoke {
                    kind: InvokeKind::Interface,
                    owner: member.owner.to_owned(),
                    name: member.name.to_owned(),
                    descriptor: member.descriptor.to_owned(),
                });
                pc += 5;
            }

            // `invokedynamic` carries two zero bytes after the index; the call site is not
            // statically determinable, so the operand is not even resolved
            INVOKEDYNAMIC => {
                instructions.push(Instruction::InvokeDynamic);
                pc += 5;
            }

            ATHROW => {
                instructions.push(Instruction::Throw);
                pc += 1;
            }

            // Operands start after padding up to the next multiple of 4 from the opcode
            TABLESWITCH => {
                let base = (pc + 4) & !3;
                let low = read_i32(bytecode, base + 4)?;
                let high = read_i32(bytecode, base + 8)?;
                if high < low {
                    return Err(Error::TruncatedCode);
                }
                // The entry count can exceed `i32` (and any real code length), so widen
                let count = i64::from(high) - i64::from(low) + 1;
                let table = usize::try_from(4 * count).map_err(|_| Error::TruncatedCode)?;
                instructions.push(Instruction::Other(opcode));
                pc = base + 12 + table;
            }

            LOOKUPSWITCH => {
                let base = (pc + 4) & !3;
                let npairs = read_i32(bytecode, base + 4)?;
                if npairs < 0 {
                    return Err(Error::TruncatedCode);
                }
                let pairs = usize::try_from(8 * i64::from(npairs)).map_err(|_| Error::TruncatedCode)?;
                instructions.push(Instruction::Other(opcode));
                pc = base + 8 + pairs;
            }

            WIDE => {
                let widened = *bytecode.get(pc + 1).ok_or(Error::TruncatedCode)?;
                instructions.push(Instruction::Other(opcode));
                pc += if widened == IINC { 6 } else { 4 };
            }

            _ => {
                instructions.push(Instruction::Other(opcode));
                pc += 1 + operand_width(opcode)?;
            }
        }

        if pc > bytecode.len() {
            return Err(Error::TruncatedCode);
        }
    }

    Ok(instructions)
}

fn read_index(bytecode: &[u8], at: usize) -> Result<ConstantIndex, Error> {
    let hi = *bytecode.get(at).ok_or(Error::TruncatedCode)?;
    let lo = *bytecode.get(at + 1).ok_or(Error::TruncatedCode)?;
    Ok(ConstantIndex(u16::from_be_bytes([hi, lo])))
}

fn read_i32(bytecode: &[u8], at: usize) -> Result<i32, Error> {
    let bytes = bytecode
        .get(at..at + 4)
        .ok_or(Error::TruncatedCode)?
        .try_into()
        .map_err(|_| Error::TruncatedCode)?;
    Ok(i32::from_be_bytes(bytes))
}

/// Width in bytes of an opcode's operands, for opcodes with a fixed width
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-6.html
fn operand_width(opcode: u8) -> Result<usize, Error> {
    let width = match opcode {
        // nop, constants
        0x00..=0x0f => 0,
        // bipush
        0x10 => 1,
        // sipush
        0x11 => 2,
        // ldc
        0x12 => 1,
        // ldc_w, ldc2_w
        0x13 | 0x14 => 2,
        // iload..aload
        0x15..=0x19 => 1,
        // iload_0..saload
        0x1a..=0x35 => 0,
        // istore..astore
        0x36..=0x3a => 1,
        // istore_0..lxor
        0x3b..=0x83 => 0,
        // iinc
        IINC => 2,
        // i2l..dcmpg
        0x85..=0x98 => 0,
        // ifeq..jsr
        0x99..=0xa8 => 2,
        // ret
        0xa9 => 1,
        // ireturn..return
        0xac..=0xb1 => 0,
        // new
        0xbb => 2,
        // newarray
        0xbc => 1,
        // anewarray
        0xbd => 2,
        // arraylength
        0xbe => 0,
        // checkcast, instanceof
        0xc0 | 0xc1 => 2,
        // monitorenter, monitorexit
        0xc2 | 0xc3 => 0,
        // multianewarray
        0xc5 => 3,
        // ifnull, ifnonnull
        0xc6 | 0xc7 => 2,
        // goto_w, jsr_w
        0xc8 | 0xc9 => 4,
        _ => return Err(Error::UnknownOpcode(opcode)),
    };
    Ok(width)
}

#[cfg(test)]
mod decode_tests {
    use super::*;
    use crate::jvm::class_file::Deserialize;

    /// Build a pool whose entry 1 is a Fieldref for `P/Owner.X:I` and entry 8 is a Methodref
    /// for `P/Owner.m:()V` (hand-assembled, same layout the JVMS describes)
    fn sample_pool() -> ConstantPool {
        let mut bytes: Vec<u8> = vec![];
        bytes.extend_from_slice(&12u16.to_be_bytes()); // count = entries + 1

        // 1: Fieldref(class=2, name_and_type=3)
        bytes.push(9);
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&3u16.to_be_bytes());
        // 2: Class(name=4)
        bytes.push(7);
        bytes.extend_from_slice(&4u16.to_be_bytes());
        // 3: NameAndType(name=5, descriptor=6)
        bytes.push(12);
        bytes.extend_from_slice(&5u16.to_be_bytes());
        bytes.extend_from_slice(&6u16.to_be_bytes());
        // 4: Utf8 "P/Owner"
        bytes.push(1);
        bytes.extend_from_slice(&7u16.to_be_bytes());
        bytes.extend_from_slice(b"P/Owner");
        // 5: Utf8 "X"
        bytes.push(1);
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(b"X");
        // 6: Utf8 "I"
        bytes.push(1);
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(b"I");
        // 7: Utf8 "()V"
        bytes.push(1);
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(b"()V");
        // 8: Methodref(class=2, name_and_type=9)
        bytes.push(10);
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&9u16.to_be_bytes());
        // 9: NameAndType(name=10, descriptor=7)
        bytes.push(12);
        bytes.extend_from_slice(&10u16.to_be_bytes());
        bytes.extend_from_slice(&7u16.to_be_bytes());
        // 10: Utf8 "m"
        bytes.push(1);
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(b"m");
        // 11: Long 1 (occupies two slots, exercising the gap handling)
        bytes.push(5);
        bytes.extend_from_slice(&1i64.to_be_bytes());

        let mut reader: &[u8] = &bytes;
        ConstantPool::deserialize(&mut reader).unwrap()
    }

    #[test]
    fn decodes_field_and_invoke() {
        let pool = sample_pool();
        let code = vec![
            0x08, // iconst_5
            GETSTATIC, 0x00, 0x01, // getstatic #1
            INVOKESTATIC, 0x00, 0x08, // invokestatic #8
            0xb1, // return
        ];
        let insns = decode(&code, &pool).unwrap();
        assert_eq!(insns.len(), 4);
        assert_eq!(
            insns[1],
            Instruction::Field {
                kind: FieldKind::GetStatic,
                owner: String::from("P/Owner"),
                name: String::from("X"),
                descriptor: String::from("I"),
            }
        );
        assert_eq!(
            insns[2],
            Instruction::Invoke {
                kind: InvokeKind::Static,
                owner: String::from("P/Owner"),
                name: String::from("m"),
                descriptor: String::from("()V"),
            }
        );
    }

    #[test]
    fn decodes_throw_and_invokedynamic() {
        let pool = sample_pool();
        let code = vec![
            INVOKEDYNAMIC, 0x00, 0x01, 0x00, 0x00, // operands not resolved
            ATHROW,
        ];
        let insns = decode(&code, &pool).unwrap();
        assert_eq!(insns, vec![Instruction::InvokeDynamic, Instruction::Throw]);
    }

    #[test]
    fn skips_tableswitch_padding() {
        let pool = sample_pool();
        // tableswitch at pc 0: pad to 4, default(4), low=0(4), high=1(4), 2 offsets(8) = ends at 24
        let mut code = vec![TABLESWITCH, 0, 0, 0];
        code.extend_from_slice(&0i32.to_be_bytes()); // default
        code.extend_from_slice(&0i32.to_be_bytes()); // low
        code.extend_from_slice(&1i32.to_be_bytes()); // high
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&0i32.to_be_bytes());
        code.push(0xb1); // return
        let insns = decode(&code, &pool).unwrap();
        assert_eq!(
            insns,
            vec![
                Instruction::Other(TABLESWITCH),
                Instruction::Other(0xb1)
            ]
        );
    }

    #[test]
    fn skips_lookupswitch_and_wide() {
        let pool = sample_pool();
        // lookupswitch at pc 1 (after nop): pad to 4, default(4), npairs=1(4), 1 pair(8)
        let mut code = vec![0x00, LOOKUPSWITCH, 0, 0];
        code.extend_from_slice(&0i32.to_be_bytes()); // default
        code.extend_from_slice(&1i32.to_be_bytes()); // npairs
        code.extend_from_slice(&7i32.to_be_bytes()); // match
        code.extend_from_slice(&0i32.to_be_bytes()); // offset
        code.extend_from_slice(&[WIDE, 0x15, 0x01, 0x00]); // wide iload 256
        code.extend_from_slice(&[WIDE, IINC, 0x01, 0x00, 0x00, 0x05]); // wide iinc
        let insns = decode(&code, &pool).unwrap();
        assert_eq!(
            insns,
            vec![
                Instruction::Other(0x00),
                Instruction::Other(LOOKUPSWITCH),
                Instruction::Other(WIDE),
                Instruction::Other(WIDE),
            ]
        );
    }

    #[test]
    fn rejects_unknown_opcode_and_truncation() {
        let pool = sample_pool();
        assert!(matches!(
            decode(&[0xff], &pool),
            Err(Error::UnknownOpcode(0xff))
        ));
        assert!(matches!(
            decode(&[GETSTATIC, 0x00], &pool),
            Err(Error::TruncatedCode)
        ));
    }

    #[test]
    fn rejects_tableswitch_with_overflowing_entry_count() {
        let pool = sample_pool();
        // low..=high spans the full i32 range; the entry count does not fit in i32
        let mut code = vec![TABLESWITCH, 0, 0, 0];
        code.extend_from_slice(&0i32.to_be_bytes()); // default
        code.extend_from_slice(&i32::MIN.to_be_bytes()); // low
        code.extend_from_slice(&i32::MAX.to_be_bytes()); // high
        assert!(matches!(decode(&code, &pool), Err(Error::TruncatedCode)));
    }
}
