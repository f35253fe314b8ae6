/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines the byte format of contract programs.
//!
//! A program is a sequence of instructions executed from offset 0. Reaching the end of the code
//! stops execution successfully.
//!
//! |Opcode |Mnemonic |Immediates                                  |
//! |:---   |:---      |:---                                         |
//! |0x00   |STOP      |                                             |
//! |0x01   |SSTORE    |key (32 bytes), value (32 bytes)             |
//! |0x02   |LOG       |n (1 byte, ≤ 4), n topics (32 bytes each), len (1 byte), data (len bytes)|
//! |0x03   |RETURN    |len (1 byte), data (len bytes)               |
//! |0x04   |REVERT    |                                             |
//!
//! REVERT is only defined once Byzantium is active. Unknown opcodes and truncated immediates
//! halt execution exceptionally.

use alloy_primitives::{Bytes, B256};

pub const STOP: u8 = 0x00;
pub const SSTORE: u8 = 0x01;
pub const LOG: u8 = 0x02;
pub const RETURN: u8 = 0x03;
pub const REVERT: u8 = 0x04;

pub const MAX_LOG_TOPICS: usize = 4;

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Stop,
    SStore { key: B256, value: B256 },
    Log { topics: Vec<B256>, data: Bytes },
    Return(Bytes),
    Revert,
}

impl Instruction {
    /// Whether execution ends after this instruction.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Instruction::Stop | Instruction::Return(_) | Instruction::Revert
        )
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Instruction::Stop => out.push(STOP),
            Instruction::SStore { key, value } => {
                out.push(SSTORE);
                out.extend_from_slice(key.as_slice());
                out.extend_from_slice(value.as_slice());
            }
            Instruction::Log { topics, data } => {
                out.push(LOG);
                out.push(topics.len() as u8);
                for topic in topics {
                    out.extend_from_slice(topic.as_slice());
                }
                out.push(data.len() as u8);
                out.extend_from_slice(data);
            }
            Instruction::Return(data) => {
                out.push(RETURN);
                out.push(data.len() as u8);
                out.extend_from_slice(data);
            }
            Instruction::Revert => out.push(REVERT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { offset: usize, opcode: u8 },

    #[error("truncated instruction at offset {offset}")]
    Truncated { offset: usize },

    #[error("{topics} log topics at offset {offset}")]
    TooManyTopics { offset: usize, topics: usize },
}

/// Decodes the instructions that can be reached by execution: decoding ends at the end of the
/// code or after the first terminal instruction, whichever comes first.
pub fn decode(code: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut cursor = Cursor { code, offset: 0 };
    let mut program = Vec::new();
    while cursor.offset < code.len() {
        let instruction = cursor.next_instruction()?;
        let terminal = instruction.is_terminal();
        program.push(instruction);
        if terminal {
            break;
        }
    }
    Ok(program)
}

struct Cursor<'a> {
    code: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn next_instruction(&mut self) -> Result<Instruction, DecodeError> {
        let start = self.offset;
        let opcode = self.take(1, start)?[0];
        let instruction = match opcode {
            STOP => Instruction::Stop,
            SSTORE => Instruction::SStore {
                key: B256::from_slice(self.take(32, start)?),
                value: B256::from_slice(self.take(32, start)?),
            },
            LOG => {
                let n = self.take(1, start)?[0] as usize;
                if n > MAX_LOG_TOPICS {
                    return Err(DecodeError::TooManyTopics {
                        offset: start,
                        topics: n,
                    });
                }
                let topics = (0..n)
                    .map(|_| self.take(32, start).map(B256::from_slice))
                    .collect::<Result<Vec<_>, _>>()?;
                let len = self.take(1, start)?[0] as usize;
                let data = Bytes::copy_from_slice(self.take(len, start)?);
                Instruction::Log { topics, data }
            }
            RETURN => {
                let len = self.take(1, start)?[0] as usize;
                Instruction::Return(Bytes::copy_from_slice(self.take(len, start)?))
            }
            REVERT => Instruction::Revert,
            opcode => {
                return Err(DecodeError::UnknownOpcode {
                    offset: start,
                    opcode,
                })
            }
        };
        Ok(instruction)
    }

    fn take(&mut self, len: usize, start: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.offset + len;
        let bytes = self
            .code
            .get(self.offset..end)
            .ok_or(DecodeError::Truncated { offset: start })?;
        self.offset = end;
        Ok(bytes)
    }
}

/// ProgramBuilder assembles contract code instruction by instruction.
#[derive(Debug, Clone, Default)]
pub struct ProgramBuilder {
    code: Vec<u8>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, instruction: Instruction) -> Self {
        instruction.encode(&mut self.code);
        self
    }

    pub fn sstore(self, key: B256, value: B256) -> Self {
        self.push(Instruction::SStore { key, value })
    }

    pub fn log(self, topics: Vec<B256>, data: impl Into<Bytes>) -> Self {
        self.push(Instruction::Log {
            topics,
            data: data.into(),
        })
    }

    pub fn ret(self, data: impl Into<Bytes>) -> Self {
        self.push(Instruction::Return(data.into()))
    }

    pub fn revert(self) -> Self {
        self.push(Instruction::Revert)
    }

    pub fn stop(self) -> Self {
        self.push(Instruction::Stop)
    }

    /// Appends raw bytes, e.g. to build malformed programs.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.code.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Bytes {
        Bytes::from(self.code)
    }
}
