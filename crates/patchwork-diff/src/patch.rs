#![forbid(unsafe_code)]

//! Binary patch capability.
//!
//! [`CopyInsertPatcher`] format (integers little-endian):
//!
//! ```text
//! "PWPATCH1" | target_len: u64 | sha256(target): [u8; 32] | op* | 0x00
//! op = 0x01 offset: u64 len: u64        copy from baseline
//!    | 0x02 len: u64 bytes[len]         insert literal bytes
//! ```

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::trace;

use crate::{DiffError, DiffResult};

const MAGIC: &[u8; 8] = b"PWPATCH1";
const OP_END: u8 = 0x00;
const OP_COPY: u8 = 0x01;
const OP_INSERT: u8 = 0x02;
const BLOCK: usize = 32;

/// Reconstructs an updated executable bundle from a baseline and a patch.
///
/// Implementations must fail with [`DiffError::CorruptPatch`] on malformed
/// input rather than return a partial result.
pub trait BinaryPatcher: Send + Sync {
    fn apply(&self, baseline: &[u8], patch: &[u8]) -> DiffResult<Vec<u8>>;
}

/// Built-in self-validating copy/insert patch format.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyInsertPatcher;

impl CopyInsertPatcher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Encode `target` as copies out of `baseline` plus literal inserts.
    ///
    /// Matches are found on `BLOCK`-aligned baseline windows and extended
    /// forward byte by byte.
    #[must_use]
    pub fn diff(&self, baseline: &[u8], target: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAGIC.len() + 8 + 32 + target.len() / 4 + 16);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(target.len() as u64).to_le_bytes());
        out.extend_from_slice(&Sha256::digest(target));

        let mut blocks: HashMap<&[u8], usize> = HashMap::new();
        for (i, chunk) in baseline.chunks_exact(BLOCK).enumerate() {
            blocks.entry(chunk).or_insert(i * BLOCK);
        }

        let mut pending_from = 0;
        let mut pos = 0;
        while pos + BLOCK <= target.len() {
            let Some(&offset) = blocks.get(&target[pos..pos + BLOCK]) else {
                pos += 1;
                continue;
            };
            let mut len = BLOCK;
            while offset + len < baseline.len()
                && pos + len < target.len()
                && baseline[offset + len] == target[pos + len]
            {
                len += 1;
            }
            push_insert(&mut out, &target[pending_from..pos]);
            push_copy(&mut out, offset, len);
            pos += len;
            pending_from = pos;
        }
        push_insert(&mut out, &target[pending_from..]);
        out.push(OP_END);
        out
    }
}

fn push_insert(out: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    out.push(OP_INSERT);
    out.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn push_copy(out: &mut Vec<u8>, offset: usize, len: usize) {
    out.push(OP_COPY);
    out.extend_from_slice(&(offset as u64).to_le_bytes());
    out.extend_from_slice(&(len as u64).to_le_bytes());
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> DiffResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| DiffError::corrupt("unexpected end of patch"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> DiffResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u64(&mut self) -> DiffResult<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    /// A length field that must fit in memory.
    fn read_len(&mut self) -> DiffResult<usize> {
        usize::try_from(self.u64()?).map_err(|_| DiffError::corrupt("length overflows usize"))
    }
}

impl BinaryPatcher for CopyInsertPatcher {
    fn apply(&self, baseline: &[u8], patch: &[u8]) -> DiffResult<Vec<u8>> {
        let mut cur = Cursor { buf: patch, pos: 0 };
        if cur.take(MAGIC.len()).ok() != Some(&MAGIC[..]) {
            return Err(DiffError::corrupt("bad magic"));
        }
        let target_len = cur.read_len()?;
        let mut expected_sha = [0u8; 32];
        expected_sha.copy_from_slice(cur.take(32)?);

        // Never allocate more than the patch itself can justify.
        let mut out = Vec::with_capacity(target_len.min(patch.len().saturating_mul(64)));
        loop {
            match cur.u8()? {
                OP_END => break,
                OP_COPY => {
                    let offset = cur.read_len()?;
                    let len = cur.read_len()?;
                    let src = offset
                        .checked_add(len)
                        .and_then(|end| baseline.get(offset..end))
                        .ok_or_else(|| {
                            DiffError::corrupt(format!(
                                "copy {offset}+{len} outside baseline of {} bytes",
                                baseline.len()
                            ))
                        })?;
                    out.extend_from_slice(src);
                }
                OP_INSERT => {
                    let len = cur.read_len()?;
                    out.extend_from_slice(cur.take(len)?);
                }
                op => return Err(DiffError::corrupt(format!("unknown op 0x{op:02x}"))),
            }
            if out.len() > target_len {
                return Err(DiffError::corrupt("output exceeds declared length"));
            }
        }

        if cur.pos != patch.len() {
            return Err(DiffError::corrupt("trailing bytes after end marker"));
        }
        if out.len() != target_len {
            return Err(DiffError::corrupt(format!(
                "output is {} bytes, expected {target_len}",
                out.len()
            )));
        }
        let actual_sha = Sha256::digest(&out);
        if actual_sha[..] != expected_sha[..] {
            return Err(DiffError::corrupt(format!(
                "checksum mismatch: expected {}, got {}",
                hex::encode(expected_sha),
                hex::encode(actual_sha)
            )));
        }
        trace!(baseline = baseline.len(), target = out.len(), "patch applied");
        Ok(out)
    }
}
