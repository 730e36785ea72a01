use crate::error::{WindcastError, WindcastResult};
use crate::metadata::SeriesMetadata;
use crate::shape::ShapedArray;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::trace;
use uuid::Uuid;

/// Binary-array writer collaborator: accepts the shaped array verbatim and
/// persists it, keyed by the payload UUID in the metadata.
pub trait ArraySink {
    fn write_array(&mut self, metadata: &SeriesMetadata, array: &ShapedArray)
        -> WindcastResult<()>;
}

/// Little-endian binary files under a data directory, one per payload UUID:
/// a `u64` rank, one `u64` per dimension, then the f64 values in row-major
/// order. Metadata is written next to the array as a JSON sidecar.
pub struct BinarySink {
    data_dir: PathBuf,
}

impl BinarySink {
    pub fn new(data_dir: impl AsRef<Path>) -> WindcastResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir)?;
        }
        Ok(Self { data_dir })
    }

    pub fn array_path(&self, payload_uuid: &Uuid) -> PathBuf {
        self.data_dir.join(format!("{payload_uuid}.bin"))
    }

    pub fn metadata_path(&self, payload_uuid: &Uuid) -> PathBuf {
        self.data_dir.join(format!("{payload_uuid}.json"))
    }

    /// Read back a persisted array as (shape, row-major values).
    pub fn read_array(&self, payload_uuid: &Uuid) -> WindcastResult<(Vec<usize>, Vec<f64>)> {
        let mut file = BufReader::new(File::open(self.array_path(payload_uuid))?);
        let rank = file.read_u64::<LittleEndian>()? as usize;
        let mut shape = Vec::with_capacity(rank);
        for _ in 0..rank {
            shape.push(file.read_u64::<LittleEndian>()? as usize);
        }
        let len: usize = shape.iter().product();
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(file.read_f64::<LittleEndian>()?);
        }
        Ok((shape, values))
    }

    pub fn read_metadata(&self, payload_uuid: &Uuid) -> WindcastResult<SeriesMetadata> {
        let contents = std::fs::read_to_string(self.metadata_path(payload_uuid))?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl ArraySink for BinarySink {
    fn write_array(
        &mut self,
        metadata: &SeriesMetadata,
        array: &ShapedArray,
    ) -> WindcastResult<()> {
        if metadata.horizon != array.shape()[0] {
            return Err(WindcastError::invalid_argument(format!(
                "array leading dimension {} does not match the metadata horizon {}",
                array.shape()[0],
                metadata.horizon
            )));
        }
        trace!(
            name = %metadata.name,
            uuid = %metadata.payload_uuid,
            shape = ?array.shape(),
            "persisting shaped array"
        );
        let mut file = BufWriter::new(File::create(self.array_path(&metadata.payload_uuid))?);
        file.write_u64::<LittleEndian>(array.rank() as u64)?;
        for &dim in array.shape() {
            file.write_u64::<LittleEndian>(dim as u64)?;
        }
        for value in array.iter_values() {
            file.write_f64::<LittleEndian>(value)?;
        }
        file.flush()?;

        let json = serde_json::to_vec_pretty(metadata)?;
        std::fs::write(self.metadata_path(&metadata.payload_uuid), json)?;
        Ok(())
    }
}
