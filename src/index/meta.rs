//! Metadata block codec: the tree's fixed, self-describing header.

use crate::error::{IndexError, Result};
use crate::pager::BlockId;
use crate::record::{Field, FieldType, TableSchema, MAX_FIELDS};

const MAGIC: &[u8; 8] = b"BURROW\0\0";
const VERSION_MAJOR: u16 = 1;
const VERSION_MINOR: u16 = 0;

const CRC_OFFSET: usize = 12;
const BODY_OFFSET: usize = 16;
const FIELD_COUNT_OFFSET: usize = 28;
const FIELD_TABLE_OFFSET: usize = 32;
const FIELD_ENTRY_LEN: usize = 24;
const FIELD_NAME_CAP: usize = FIELD_ENTRY_LEN - 3;
const META_REGION_LEN: usize = FIELD_TABLE_OFFSET + MAX_FIELDS * FIELD_ENTRY_LEN;

/// In-memory image of the metadata block (block 0).
#[derive(Clone, Debug)]
pub struct TreeMeta {
    /// Block holding the current root node.
    pub root: BlockId,
    /// Node levels from root to leaf inclusive; 1 means the root is a leaf.
    pub height: u32,
    /// Blocks allocated so far, including this one.
    pub total_blocks: u32,
    /// Schema of the records this tree stores.
    pub schema: TableSchema,
}

impl TreeMeta {
    /// Decodes and validates the metadata block.
    ///
    /// A magic or version mismatch means the file is not an index of this
    /// format and fails with [`IndexError::InvalidFormat`]; a checksum
    /// mismatch on an otherwise recognized block is corruption.
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() < META_REGION_LEN {
            return Err(IndexError::Corruption(
                "metadata block shorter than expected".into(),
            ));
        }
        if &data[..MAGIC.len()] != MAGIC {
            return Err(IndexError::InvalidFormat(
                "metadata magic does not match".into(),
            ));
        }
        let major = u16::from_le_bytes([data[8], data[9]]);
        let minor = u16::from_le_bytes([data[10], data[11]]);
        if major != VERSION_MAJOR || minor != VERSION_MINOR {
            return Err(IndexError::InvalidFormat(format!(
                "unsupported format version {major}.{minor}"
            )));
        }
        let stored_crc = u32::from_le_bytes(
            data[CRC_OFFSET..BODY_OFFSET]
                .try_into()
                .expect("slice has exactly 4 bytes"),
        );
        let actual_crc = crc32fast::hash(&data[BODY_OFFSET..META_REGION_LEN]);
        if stored_crc != actual_crc {
            return Err(IndexError::Corruption(
                "metadata checksum mismatch".into(),
            ));
        }

        let root = u32::from_le_bytes(data[16..20].try_into().expect("slice has exactly 4 bytes"));
        let height =
            u32::from_le_bytes(data[20..24].try_into().expect("slice has exactly 4 bytes"));
        let total_blocks =
            u32::from_le_bytes(data[24..28].try_into().expect("slice has exactly 4 bytes"));
        if height == 0 {
            return Err(IndexError::Corruption(
                "tree height must be at least one".into(),
            ));
        }

        let field_count = data[FIELD_COUNT_OFFSET] as usize;
        if field_count == 0 || field_count > MAX_FIELDS {
            return Err(IndexError::Corruption(format!(
                "metadata field count {field_count} out of range"
            )));
        }
        let mut fields = Vec::with_capacity(field_count);
        for i in 0..field_count {
            let entry = &data[FIELD_TABLE_OFFSET + i * FIELD_ENTRY_LEN..][..FIELD_ENTRY_LEN];
            let ty = FieldType::from_parts(entry[0], entry[1])?;
            let name_len = entry[2] as usize;
            if name_len == 0 || name_len > FIELD_NAME_CAP {
                return Err(IndexError::Corruption(
                    "metadata field name length out of range".into(),
                ));
            }
            let name = std::str::from_utf8(&entry[3..3 + name_len])
                .map_err(|_| {
                    IndexError::Corruption("metadata field name is not valid UTF-8".into())
                })?
                .to_string();
            fields.push(Field { name, ty });
        }
        let schema = TableSchema::new(fields)
            .map_err(|_| IndexError::Corruption("metadata holds an invalid schema".into()))?;

        Ok(Self {
            root,
            height,
            total_blocks,
            schema,
        })
    }

    /// Encodes the metadata into a block image, stamping the checksum last.
    pub fn write(&self, data: &mut [u8]) -> Result<()> {
        if data.len() < META_REGION_LEN {
            return Err(IndexError::Corruption(
                "metadata block shorter than expected".into(),
            ));
        }
        data[..META_REGION_LEN].fill(0);
        data[..MAGIC.len()].copy_from_slice(MAGIC);
        data[8..10].copy_from_slice(&VERSION_MAJOR.to_le_bytes());
        data[10..12].copy_from_slice(&VERSION_MINOR.to_le_bytes());
        data[16..20].copy_from_slice(&self.root.to_le_bytes());
        data[20..24].copy_from_slice(&self.height.to_le_bytes());
        data[24..28].copy_from_slice(&self.total_blocks.to_le_bytes());

        let fields = self.schema.fields();
        data[FIELD_COUNT_OFFSET] = fields.len() as u8;
        for (i, field) in fields.iter().enumerate() {
            let entry = &mut data[FIELD_TABLE_OFFSET + i * FIELD_ENTRY_LEN..][..FIELD_ENTRY_LEN];
            let (tag, aux) = field.ty.to_parts();
            entry[0] = tag;
            entry[1] = aux;
            let name = field.name.as_bytes();
            entry[2] = name.len() as u8;
            entry[3..3 + name.len()].copy_from_slice(name);
        }

        let crc = crc32fast::hash(&data[BODY_OFFSET..META_REGION_LEN]);
        data[CRC_OFFSET..BODY_OFFSET].copy_from_slice(&crc.to_le_bytes());
        Ok(())
    }
}
