use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{ContainerError, ContainerResult};

use super::layout::ContainerLayout;

/// Worker counts stored at the front of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerCounts {
    pub total: u16,
    pub nonsub: u16,
}

impl WorkerCounts {
    /// Workers that are only called as subroutines.
    pub fn subroutines(&self) -> u16 {
        self.total.saturating_sub(self.nonsub)
    }
}

/// Seekable header access for a container opened read/write.
pub struct HeaderIo<'a, S> {
    stream: &'a mut S,
    layout: &'a ContainerLayout,
}

impl<'a, S: Read + Seek> HeaderIo<'a, S> {
    pub fn new(stream: &'a mut S, layout: &'a ContainerLayout) -> Self {
        Self { stream, layout }
    }

    pub fn stream_len(&mut self) -> ContainerResult<u64> {
        Ok(self.stream.seek(SeekFrom::End(0))?)
    }

    pub fn read_counts(&mut self) -> ContainerResult<WorkerCounts> {
        let len = self.stream_len()?;
        let needed = self.layout.pointer_table_off();
        if len < needed {
            return Err(ContainerError::Truncated { len, needed });
        }
        self.stream.seek(SeekFrom::Start(self.layout.worker_count_off))?;
        let total = self.stream.read_u16::<LittleEndian>()?;
        let nonsub = self.stream.read_u16::<LittleEndian>()?;
        Ok(WorkerCounts { total, nonsub })
    }

    pub fn read_pointer(&mut self, index: u16) -> ContainerResult<u32> {
        self.stream.seek(SeekFrom::Start(self.layout.pointer_slot(index)))?;
        Ok(self.stream.read_u32::<LittleEndian>()?)
    }

    pub fn read_pointers(&mut self, count: u16) -> ContainerResult<Vec<u32>> {
        self.stream.seek(SeekFrom::Start(self.layout.pointer_table_off()))?;
        let mut pointers = vec![0u32; count as usize];
        self.stream.read_u32_into::<LittleEndian>(&mut pointers)?;
        Ok(pointers)
    }

    pub fn read_base_value(&mut self) -> ContainerResult<u32> {
        self.stream.seek(SeekFrom::Start(self.layout.base_value_off))?;
        Ok(self.stream.read_u32::<LittleEndian>()?)
    }

    pub fn read_record(&mut self, location: u64) -> ContainerResult<Vec<u8>> {
        self.stream.seek(SeekFrom::Start(location))?;
        let mut record = vec![0u8; self.layout.record_size as usize];
        self.stream.read_exact(&mut record)?;
        Ok(record)
    }
}

impl<'a, S: Read + Write + Seek> HeaderIo<'a, S> {
    pub fn write_counts(&mut self, counts: WorkerCounts) -> ContainerResult<()> {
        self.stream.seek(SeekFrom::Start(self.layout.worker_count_off))?;
        self.stream.write_u16::<LittleEndian>(counts.total)?;
        self.stream.write_u16::<LittleEndian>(counts.nonsub)?;
        Ok(())
    }

    pub fn write_pointer(&mut self, index: u16, pointer: u32) -> ContainerResult<()> {
        self.stream.seek(SeekFrom::Start(self.layout.pointer_slot(index)))?;
        self.stream.write_u32::<LittleEndian>(pointer)?;
        Ok(())
    }

    pub fn zero_aux_fields(&mut self) -> ContainerResult<()> {
        for &(offset, width) in &self.layout.aux_fields {
            self.stream.seek(SeekFrom::Start(offset))?;
            self.stream.write_all(&vec![0u8; width as usize])?;
        }
        Ok(())
    }

    /// Copies `bytes` to EOF and returns where they landed.
    pub fn append(&mut self, bytes: &[u8]) -> ContainerResult<u64> {
        let at = self.stream.seek(SeekFrom::End(0))?;
        self.stream.write_all(bytes)?;
        Ok(at)
    }

    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> ContainerResult<()> {
        self.stream.seek(SeekFrom::Start(offset))?;
        self.stream.write_all(bytes)?;
        Ok(())
    }

    pub fn read_at(&mut self, offset: u64, len: usize) -> ContainerResult<Vec<u8>> {
        self.stream.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }
}
