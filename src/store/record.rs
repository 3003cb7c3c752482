//! Record type - the unit written to the transaction log file

use crate::model::Tx;
use crate::{Error, Result};

/// Length prefix size of a framed record
pub const FRAME_HEADER_SIZE: usize = 4;

/// Type tag for records
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordType {
    /// A committed transaction
    Tx,
}

impl RecordType {
    pub fn as_byte(&self) -> u8 {
        match self {
            RecordType::Tx => 0,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(RecordType::Tx),
            _ => None,
        }
    }
}

/// A typed chunk of data, compressed on disk
#[derive(Clone, Debug)]
pub struct Record {
    pub record_type: RecordType,
    /// Raw data (uncompressed)
    pub data: Vec<u8>,
}

impl Record {
    pub fn new(record_type: RecordType, data: Vec<u8>) -> Self {
        Record { record_type, data }
    }

    /// Serialize a transaction into a record
    pub fn from_tx(tx: &Tx) -> Result<Self> {
        Ok(Record::new(RecordType::Tx, bincode::serialize(tx)?))
    }

    /// Deserialize the transaction held by this record
    pub fn to_tx(&self) -> Result<Tx> {
        if self.record_type != RecordType::Tx {
            return Err(Error::InvalidFile(format!(
                "Expected Tx record, got {:?}",
                self.record_type
            )));
        }
        Ok(bincode::deserialize(&self.data)?)
    }

    /// Encode as `u32_le(len) || type || zstd(data)`
    pub fn frame(&self) -> Result<Vec<u8>> {
        let compressed = zstd::encode_all(self.data.as_slice(), 3)?;
        let len = (compressed.len() + 1) as u32;

        let mut output = Vec::with_capacity(FRAME_HEADER_SIZE + len as usize);
        output.extend_from_slice(&len.to_le_bytes());
        output.push(self.record_type.as_byte());
        output.extend(compressed);
        Ok(output)
    }

    /// Decode the payload of a frame (everything after the length prefix)
    pub fn unframe(payload: &[u8]) -> Result<Self> {
        let (&tag, compressed) = payload
            .split_first()
            .ok_or_else(|| Error::InvalidFile("Empty record".into()))?;

        let record_type = RecordType::from_byte(tag)
            .ok_or_else(|| Error::InvalidFile(format!("Invalid record type: {}", tag)))?;

        let data = zstd::decode_all(compressed)?;

        Ok(Record { record_type, data })
    }

    /// Size of the uncompressed data
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Length of the next frame's payload, if its prefix is fully present
pub fn payload_len(buf: &[u8]) -> Option<usize> {
    let prefix: [u8; FRAME_HEADER_SIZE] = buf.get(..FRAME_HEADER_SIZE)?.try_into().ok()?;
    Some(u32::from_le_bytes(prefix) as usize)
}
