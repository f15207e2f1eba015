use std::ffi::CString;

use crate::protocol::{serde::*, ProtocolError};

use super::CommandReply;

/// Parameters for [`super::Command::LookupSink`] and [`super::Command::LookupSource`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LookupParams {
    /// The name of the sink or source to look up.
    pub name: CString,
}

impl TagStructRead for LookupParams {
    fn read(ts: &mut TagStructReader<'_>, _protocol_version: u16) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: ts.read_string_non_null()?,
        })
    }
}

impl TagStructWrite for LookupParams {
    fn write(
        &self,
        w: &mut TagStructWriter<'_>,
        _protocol_version: u16,
    ) -> Result<(), ProtocolError> {
        w.write_string(Some(&self.name))?;
        Ok(())
    }
}

/// The server response to [`super::Command::LookupSource`] and [`super::Command::LookupSink`].
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct LookupReply(u32);

impl LookupReply {
    /// Builds a reply carrying the looked-up sink/source's index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }
}

impl CommandReply for LookupReply {}

impl TagStructRead for LookupReply {
    fn read(ts: &mut TagStructReader<'_>, _protocol_version: u16) -> Result<Self, ProtocolError> {
        Ok(Self(ts.read_u32()?))
    }
}

impl TagStructWrite for LookupReply {
    fn write(
        &self,
        w: &mut TagStructWriter<'_>,
        _protocol_version: u16,
    ) -> Result<(), ProtocolError> {
        w.write_u32(self.0)?;
        Ok(())
    }
}
