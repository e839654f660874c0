use super::{read, write};
use crate::error::{Error, Result};
use crate::models::{ActionKind, Device, DeviceType, NewDevice, RuleAction};
use crate::services::condition_evaluator::DeviceSnapshot;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

const DEFAULT_ROOM: &str = "Unassigned";

#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Device>>,
}

impl DeviceRegistry {
    /// All devices ordered by room, then name.
    pub fn list(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = read(&self.devices).values().cloned().collect();
        devices.sort_by(|a, b| a.room.cmp(&b.room).then_with(|| a.name.cmp(&b.name)));
        devices
    }

    pub fn len(&self) -> usize {
        read(&self.devices).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Result<Device> {
        read(&self.devices)
            .get(id)
            .cloned()
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))
    }

    /// Onboard a device. It starts switched off with the type's default value.
    pub fn add(&self, new_device: NewDevice) -> Result<Device> {
        let id = new_device.id.trim().to_string();
        let name = new_device.name.trim().to_string();
        if id.is_empty() || name.is_empty() {
            return Err(Error::InvalidDevice(
                "id and name are required".to_string(),
            ));
        }

        let mut devices = write(&self.devices);
        if devices.contains_key(&id) {
            return Err(Error::DeviceExists(id));
        }

        let device = Device {
            id: id.clone(),
            name,
            device_type: new_device.device_type,
            status: false,
            value: new_device.device_type.default_value(),
            room: new_device
                .room
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ROOM.to_string()),
            icon: new_device
                .icon
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| new_device.device_type.default_icon().to_string()),
            updated_at: Utc::now(),
        };
        devices.insert(id, device.clone());
        Ok(device)
    }

    pub fn set_status(&self, id: &str, status: bool) -> Result<Device> {
        self.modify(id, |device| {
            device.status = status;
            Ok(())
        })
    }

    pub fn set_value(&self, id: &str, value: f64) -> Result<Device> {
        if !value.is_finite() {
            return Err(Error::InvalidDevice(format!("value must be a number, got {}", value)));
        }
        self.modify(id, |device| {
            device.value = Some(value);
            Ok(())
        })
    }

    pub fn delete(&self, id: &str) -> Result<Device> {
        write(&self.devices)
            .remove(id)
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))
    }

    /// Apply one rule action to its target device.
    pub fn apply_action(&self, action: &RuleAction) -> Result<Device> {
        match action.action {
            ActionKind::TurnOn => self.set_status(&action.device_id, true),
            ActionKind::TurnOff => self.set_status(&action.device_id, false),
            ActionKind::SetValue => {
                let value = action.value.ok_or_else(|| {
                    Error::InvalidAction(format!(
                        "setValue on '{}' requires a value",
                        action.device_id
                    ))
                })?;
                self.set_value(&action.device_id, value)
            }
        }
    }

    /// Status and value of every device, keyed by id.
    pub fn snapshot(&self) -> HashMap<String, DeviceSnapshot> {
        read(&self.devices)
            .iter()
            .map(|(id, device)| {
                (
                    id.clone(),
                    DeviceSnapshot {
                        status: device.status,
                        value: device.value,
                    },
                )
            })
            .collect()
    }

    pub fn seed_defaults(&self) {
        if !self.is_empty() {
            return;
        }

        let now = Utc::now();
        let defaults = [
            ("light1", "Living Room Light", DeviceType::Light, true, Some(75.0), "Living Room", "💡"),
            ("ac1", "Air Conditioner", DeviceType::Aircon, true, Some(24.0), "Bedroom", "❄️"),
            ("vacuum1", "Robot Vacuum", DeviceType::Vacuum, false, None, "Living Room", "🤖"),
        ];

        let mut devices = write(&self.devices);
        for (id, name, device_type, status, value, room, icon) in defaults {
            devices.insert(
                id.to_string(),
                Device {
                    id: id.to_string(),
                    name: name.to_string(),
                    device_type,
                    status,
                    value,
                    room: room.to_string(),
                    icon: icon.to_string(),
                    updated_at: now,
                },
            );
        }
    }

    fn modify<F>(&self, id: &str, f: F) -> Result<Device>
    where
        F: FnOnce(&mut Device) -> Result<()>,
    {
        let mut devices = write(&self.devices);
        let device = devices
            .get_mut(id)
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))?;
        f(device)?;
        device.updated_at = Utc::now();
        Ok(device.clone())
    }
}
