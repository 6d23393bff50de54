// SPDX-License-Identifier: GPL-3.0-only

//! Device discovery and input wrapping

use super::Transaction;
use crate::backends::{CaptureBackend, CaptureDevice, DevicePosition, InputHandle};
use crate::capture::state::CameraFacing;
use crate::errors::SetupError;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct RegisteredDevice {
    device: CaptureDevice,
    input: InputHandle,
}

/// Back camera, front camera and microphone, each wrapped as an input
///
/// All three are required. There is no degraded mode for hardware without
/// them.
#[derive(Debug, Clone)]
pub struct DeviceInputRegistry {
    back: RegisteredDevice,
    front: RegisteredDevice,
    audio: RegisteredDevice,
}

impl DeviceInputRegistry {
    pub fn discover<B: CaptureBackend + ?Sized>(backend: &mut B) -> Result<Self, SetupError> {
        let back = register(backend, DevicePosition::Back)?;
        let front = register(backend, DevicePosition::Front)?;
        let audio = register(backend, DevicePosition::Microphone)?;

        info!(
            back = %back.device.name,
            front = %front.device.name,
            audio = %audio.device.name,
            "Capture devices discovered"
        );
        Ok(Self { back, front, audio })
    }

    fn camera(&self, facing: CameraFacing) -> &RegisteredDevice {
        match facing {
            CameraFacing::Back => &self.back,
            CameraFacing::Front => &self.front,
        }
    }

    /// Camera device backing `facing`, for torch queries
    pub fn active_device(&self, facing: CameraFacing) -> &CaptureDevice {
        &self.camera(facing).device
    }

    pub fn camera_input(&self, facing: CameraFacing) -> &InputHandle {
        &self.camera(facing).input
    }

    pub fn audio_device(&self) -> &CaptureDevice {
        &self.audio.device
    }

    pub fn audio_input(&self) -> &InputHandle {
        &self.audio.input
    }

    /// All discovered devices
    pub fn devices(&self) -> [&CaptureDevice; 3] {
        [&self.back.device, &self.front.device, &self.audio.device]
    }

    /// Replace the attached camera input with the one for `facing`
    ///
    /// If the session refuses the new input the previous one goes back in.
    pub fn attach_camera(
        &self,
        txn: &mut Transaction<'_>,
        current: Option<CameraFacing>,
        facing: CameraFacing,
    ) -> Result<(), SetupError> {
        if let Some(current) = current {
            txn.remove_input(self.camera_input(current));
        }

        let target = self.camera(facing);
        if !txn.can_add_input(&target.input) {
            if let Some(current) = current {
                txn.add_input(self.camera_input(current));
            }
            return Err(SetupError::InputRejected(target.input.position.label()));
        }

        txn.add_input(&target.input);
        debug!(camera = %target.device.name, "Camera input attached");
        Ok(())
    }

    pub fn attach_audio(&self, txn: &mut Transaction<'_>) -> Result<(), SetupError> {
        if !txn.can_add_input(&self.audio.input) {
            return Err(SetupError::InputRejected(DevicePosition::Microphone.label()));
        }
        txn.add_input(&self.audio.input);
        Ok(())
    }

    pub fn detach_audio(&self, txn: &mut Transaction<'_>) {
        txn.remove_input(&self.audio.input);
    }
}

fn register<B: CaptureBackend + ?Sized>(
    backend: &mut B,
    position: DevicePosition,
) -> Result<RegisteredDevice, SetupError> {
    let device = backend
        .default_device(position)
        .ok_or(SetupError::DeviceNotFound(position.label()))?;

    let input = backend
        .make_input(&device)
        .map_err(|source| SetupError::InputUnavailable {
            device: position.label(),
            source,
        })?;

    if !backend.can_add_input(&input) {
        return Err(SetupError::InputRejected(position.label()));
    }

    Ok(RegisteredDevice { device, input })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::{Faults, SimulatedBackend};

    #[test]
    fn test_discover_all_devices() {
        let mut backend = SimulatedBackend::new();
        let registry = DeviceInputRegistry::discover(&mut backend).unwrap();

        assert_eq!(
            registry.active_device(CameraFacing::Back).position,
            DevicePosition::Back
        );
        assert_eq!(
            registry.camera_input(CameraFacing::Front).position,
            DevicePosition::Front
        );
        assert!(!registry.audio_input().is_camera());
        assert_eq!(registry.devices().len(), 3);
    }

    #[test]
    fn test_missing_microphone_is_fatal() {
        let mut backend = SimulatedBackend::new().without_device(DevicePosition::Microphone);
        let err = DeviceInputRegistry::discover(&mut backend).unwrap_err();
        assert!(matches!(err, SetupError::DeviceNotFound("microphone")));
    }

    #[test]
    fn test_input_creation_failure() {
        let mut backend = SimulatedBackend::new().with_faults(Faults {
            input_creation: true,
            ..Default::default()
        });
        let err = DeviceInputRegistry::discover(&mut backend).unwrap_err();
        assert!(matches!(
            err,
            SetupError::InputUnavailable {
                device: "back camera",
                ..
            }
        ));
    }

    #[test]
    fn test_rejected_camera_keeps_previous_input() {
        let backend = SimulatedBackend::new();
        let probe = backend.probe();
        let mut boxed: Box<dyn CaptureBackend> = Box::new(backend);
        let registry = DeviceInputRegistry::discover(boxed.as_mut()).unwrap();

        {
            let mut txn = Transaction::begin(&mut boxed);
            registry
                .attach_camera(&mut txn, None, CameraFacing::Back)
                .unwrap();
        }

        probe.set_faults(Faults {
            reject_inputs: true,
            ..Default::default()
        });
        {
            let mut txn = Transaction::begin(&mut boxed);
            let err = registry
                .attach_camera(&mut txn, Some(CameraFacing::Back), CameraFacing::Front)
                .unwrap_err();
            assert!(matches!(err, SetupError::InputRejected("front camera")));
        }

        let graph = probe.graph();
        assert_eq!(graph.inputs, vec![registry.camera_input(CameraFacing::Back).clone()]);
    }
}
