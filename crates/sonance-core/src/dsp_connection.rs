//! Edges of the DSP graph.

use crate::dsp::Dsp;
use crate::error::Result;
use crate::flags::DspConnectionType;
use crate::handle::native_object;
use crate::mix_matrix::{MixMatrix, read_matrix, read_matrix_size, write_matrix};
use crate::native::RawHandle;

native_object!(
    /// A connection from one unit's output to another's input.
    ///
    /// The engine owns connections; wrappers are always borrowed and go
    /// stale when either end is disconnected.
    DspConnection, DspConnection
);

impl DspConnection {
    /// Linear gain applied along the edge.
    pub fn mix(&self) -> Result<f32> {
        let mut volume = 0.0;
        self.handle
            .api()
            .connection_get_mix(self.raw(), &mut volume)
            .check("DSPConnection_GetMix")?;
        Ok(volume)
    }

    /// Sets the edge gain.
    pub fn set_mix(&self, volume: f32) -> Result<()> {
        self.handle
            .api()
            .connection_set_mix(self.raw(), volume)
            .check("DSPConnection_SetMix")?;
        Ok(())
    }

    /// `(out, in)` dimensions of the edge's mix matrix.
    pub fn mix_matrix_size(&self) -> Result<(usize, usize)> {
        let api = self.handle.api();
        let raw = self.raw();
        read_matrix_size(
            || "DSPConnection_GetMixMatrix".into(),
            |buf, out, inp, hop| api.connection_get_mix_matrix(raw, buf, out, inp, hop),
        )
    }

    /// The edge's mix matrix; empty when none is set.
    pub fn mix_matrix(&self) -> Result<MixMatrix> {
        let api = self.handle.api();
        let raw = self.raw();
        read_matrix(
            || "DSPConnection_GetMixMatrix".into(),
            |buf, out, inp, hop| api.connection_get_mix_matrix(raw, buf, out, inp, hop),
        )
    }

    /// Replaces the edge's mix matrix.
    pub fn set_mix_matrix(&self, matrix: &MixMatrix) -> Result<()> {
        let api = self.handle.api();
        let raw = self.raw();
        write_matrix(
            || "DSPConnection_SetMixMatrix".into(),
            matrix,
            |data, out, inp, hop| api.connection_set_mix_matrix(raw, data, out, inp, hop),
        )
    }

    /// Unit feeding this edge.
    pub fn input(&self) -> Result<Dsp> {
        let mut dsp = RawHandle::NULL;
        self.handle
            .api()
            .connection_get_input(self.raw(), &mut dsp)
            .check("DSPConnection_GetInput")?;
        Ok(Dsp::borrowed(self.handle.ctx(), dsp))
    }

    /// Unit this edge feeds.
    pub fn output(&self) -> Result<Dsp> {
        let mut dsp = RawHandle::NULL;
        self.handle
            .api()
            .connection_get_output(self.raw(), &mut dsp)
            .check("DSPConnection_GetOutput")?;
        Ok(Dsp::borrowed(self.handle.ctx(), dsp))
    }

    /// How the edge carries signal.
    pub fn connection_type(&self) -> Result<DspConnectionType> {
        let mut code = 0;
        self.handle
            .api()
            .connection_get_type(self.raw(), &mut code)
            .check("DSPConnection_GetType")?;
        Ok(DspConnectionType::from_code(code)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArgumentError, Error};
    use crate::flags::DspType;
    use crate::mock::MockEngine;
    use crate::status::Status;
    use crate::system::System;
    use std::sync::Arc;

    fn connect() -> (Arc<MockEngine>, System, Dsp, Dsp, DspConnection) {
        let engine = Arc::new(MockEngine::new());
        let system = System::builder(engine.clone()).build().unwrap();
        let mixer = system.create_dsp_by_type(DspType::Mixer).unwrap();
        let send = system.create_dsp_by_type(DspType::Send).unwrap();
        let connection = mixer.add_input(&send, DspConnectionType::Send).unwrap();
        (engine, system, mixer, send, connection)
    }

    #[test]
    fn endpoints_and_type() {
        let (_engine, _system, mixer, send, connection) = connect();
        assert!(!connection.is_owned());
        assert_eq!(connection.input().unwrap().raw(), send.raw());
        assert_eq!(connection.output().unwrap().raw(), mixer.raw());
        assert_eq!(connection.connection_type().unwrap(), DspConnectionType::Send);
    }

    #[test]
    fn mix_round_trip() {
        let (_engine, _system, _mixer, _send, connection) = connect();
        assert_eq!(connection.mix().unwrap(), 1.0);
        connection.set_mix(0.3).unwrap();
        assert_eq!(connection.mix().unwrap(), 0.3);
    }

    #[test]
    fn matrix_two_phase_read() {
        let (engine, _system, _mixer, _send, connection) = connect();
        assert_eq!(connection.mix_matrix().unwrap(), MixMatrix::empty());
        assert_eq!(engine.call_count("DSPConnection_GetMixMatrix"), 1);

        let matrix = MixMatrix::from_rows(&[[1.0f32, 0.5], [0.25, 0.75]]).unwrap();
        connection.set_mix_matrix(&matrix).unwrap();
        assert_eq!(connection.mix_matrix_size().unwrap(), (2, 2));
        assert_eq!(connection.mix_matrix().unwrap(), matrix);
        // Empty read, size query, then size + data for the full read.
        assert_eq!(engine.call_count("DSPConnection_GetMixMatrix"), 4);
    }

    #[test]
    fn empty_matrix_rejected_locally() {
        let (engine, _system, _mixer, _send, connection) = connect();
        let err = connection.set_mix_matrix(&MixMatrix::empty()).unwrap_err();
        assert_eq!(err, Error::Argument(ArgumentError::EmptyMatrix));
        assert_eq!(engine.call_count("DSPConnection_SetMixMatrix"), 0);
    }

    #[test]
    fn disconnected_edge_is_stale() {
        let (_engine, _system, mixer, _send, connection) = connect();
        mixer.disconnect_all(true, true).unwrap();
        assert_eq!(
            connection.mix().unwrap_err().status(),
            Some(Status::ERR_INVALID_HANDLE)
        );
    }
}
