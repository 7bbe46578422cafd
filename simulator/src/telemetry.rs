use rand::Rng;
use serde::Serialize;

/// Body of `POST /api/data`
#[derive(Debug, Clone, Serialize)]
pub struct Upload {
    pub device_id: String,
    pub device_name: String,
    pub data: SensorData,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorData {
    pub temperature: f64,
    pub humidity: f64,
    pub rssi: i32,
    pub free_heap: u32,
}

/// A simulated board: a display name plus a MAC-like suffix that keeps
/// device ids unique across boards sharing a name.
#[derive(Debug, Clone)]
pub struct Device {
    pub name: String,
    pub id: String,
}

impl Device {
    pub fn new(name: &str, index: usize) -> Self {
        let mac: Vec<String> = (0..6)
            .map(|i| format!("{:02X}", ((index as u64) >> (8 * (5 - i))) as u8 ^ 0xA5))
            .collect();
        Self {
            name: name.to_string(),
            id: format!("{}_{}", name, mac.join(":")),
        }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> Upload {
        Upload {
            device_id: self.id.clone(),
            device_name: self.name.clone(),
            data: generate_data(rng),
        }
    }
}

fn generate_data(rng: &mut impl Rng) -> SensorData {
    let temperature = if rng.gen_bool(0.05) {
        rng.gen_range(-50.0..100.0) // 5% outliers
    } else {
        rng.gen_range(15.0..35.0)
    };

    let humidity = if rng.gen_bool(0.05) {
        rng.gen_range(0.0..100.0) // 5% outliers
    } else {
        rng.gen_range(30.0..80.0)
    };

    SensorData {
        // Two decimals, as the firmware rounds before sending
        temperature: (temperature * 100.0_f64).round() / 100.0,
        humidity: (humidity * 100.0_f64).round() / 100.0,
        rssi: rng.gen_range(-90..-30),
        free_heap: rng.gen_range(120_000..240_000),
    }
}
