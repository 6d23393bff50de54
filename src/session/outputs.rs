// SPDX-License-Identifier: GPL-3.0-only

//! Photo / movie output switching

use super::Transaction;
use crate::backends::OutputKind;
use crate::capture::state::OutputMode;
use crate::errors::SetupError;
use tracing::debug;

/// Keeps exactly one of the two outputs attached
#[derive(Debug, Default)]
pub struct SessionOutputSwitch {
    attached: Option<OutputMode>,
}

impl SessionOutputSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output sink serving `mode`
    pub fn output_for(mode: OutputMode) -> OutputKind {
        match mode {
            OutputMode::Photo => OutputKind::Photo,
            OutputMode::Video => OutputKind::MovieFile,
        }
    }

    pub fn attached(&self) -> Option<OutputMode> {
        self.attached
    }

    /// Detach the current output and attach the one for `mode`
    ///
    /// Must run inside `txn` so the swap is a single visible change. When
    /// the new output is refused, the previous one is put back.
    pub fn attach(&mut self, txn: &mut Transaction<'_>, mode: OutputMode) -> Result<(), SetupError> {
        let previous = self.attached.take();
        if let Some(previous) = previous {
            txn.remove_output(Self::output_for(previous));
        }

        let target = Self::output_for(mode);
        if !txn.can_add_output(target) {
            if let Some(previous) = previous {
                txn.add_output(Self::output_for(previous));
                self.attached = Some(previous);
            }
            return Err(SetupError::OutputRejected(target.label()));
        }

        txn.add_output(target);
        self.attached = Some(mode);
        debug!(output = target.label(), "Output attached");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::CaptureBackend;
    use crate::backends::simulated::SimulatedBackend;

    #[test]
    fn test_swap_is_one_commit_with_one_output() {
        let backend = SimulatedBackend::new();
        let probe = backend.probe();
        let mut boxed: Box<dyn CaptureBackend> = Box::new(backend);
        let mut switch = SessionOutputSwitch::new();

        for mode in [OutputMode::Photo, OutputMode::Video, OutputMode::Photo] {
            let mut txn = Transaction::begin(&mut boxed);
            switch.attach(&mut txn, mode).unwrap();
        }

        let commits = probe.commits();
        assert_eq!(commits.len(), 3);
        assert!(commits.iter().all(|graph| graph.outputs.len() == 1));
        assert_eq!(commits[1].outputs, vec![OutputKind::MovieFile]);
        assert_eq!(switch.attached(), Some(OutputMode::Photo));
    }

    #[test]
    fn test_same_mode_is_harmless() {
        let backend = SimulatedBackend::new();
        let probe = backend.probe();
        let mut boxed: Box<dyn CaptureBackend> = Box::new(backend);
        let mut switch = SessionOutputSwitch::new();

        for _ in 0..2 {
            let mut txn = Transaction::begin(&mut boxed);
            switch.attach(&mut txn, OutputMode::Photo).unwrap();
        }
        assert_eq!(probe.graph().outputs, vec![OutputKind::Photo]);
    }
}
