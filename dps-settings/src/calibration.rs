//! ADC/DAC calibration coefficients
//!
//! Each coefficient is stored as its own 4-byte unit holding the `f32`
//! bits. A coefficient that was never calibrated falls back to the
//! default for the power supply model, so a partial calibration is
//! usable.
//!
//! Conversions are linear: `adc = k * value + c` and `dac = k * value + c`.

use dps_hal::BlockDevice;
use dps_past::Past;

use crate::error::SettingsError;
use crate::ids::ParameterId;
use crate::param;

/// Supported power supply models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Model {
    Dps5015,
    #[default]
    Dps5005,
    Dp50v5a,
    Dps3005,
}

impl Model {
    /// Factory calibration of the model
    pub const fn defaults(self) -> Calibration {
        let (a_adc_k, a_adc_c, a_dac_k, a_dac_c) = match self {
            Model::Dps5015 => (6.8403, -394.06, 0.166666, 261.6666),
            Model::Dps5005 => (1.713, -118.51, 0.652, 288.611),
            Model::Dp50v5a => (1.74096, -121.3943805, 0.6402, 299.5518),
            Model::Dps3005 => (1.751, -1.101, 0.653, 262.5),
        };
        let (v_dac_k, v_dac_c, v_adc_k, v_adc_c) = match self {
            Model::Dps5015 => (0.072266, 4.444777, 13.012, -125.732),
            Model::Dps5005 => (0.072, 1.85, 13.164, -100.751),
            Model::Dp50v5a => (0.07544, 2.1563, 13.253, -103.105),
            Model::Dps3005 => (0.0761, 2.2857, 13.131, -111.9),
        };
        Calibration {
            a_adc_k,
            a_adc_c,
            a_dac_k,
            a_dac_c,
            v_dac_k,
            v_dac_c,
            v_adc_k,
            v_adc_c,
            vin_adc_k: 16.746,
            vin_adc_c: 64.112,
        }
    }
}

/// One calibration coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Coefficient {
    AAdcK,
    AAdcC,
    ADacK,
    ADacC,
    VDacK,
    VDacC,
    VAdcK,
    VAdcC,
    VinAdcK,
    VinAdcC,
}

impl Coefficient {
    pub const ALL: [Coefficient; 10] = [
        Coefficient::AAdcK,
        Coefficient::AAdcC,
        Coefficient::ADacK,
        Coefficient::ADacC,
        Coefficient::VDacK,
        Coefficient::VDacC,
        Coefficient::VAdcK,
        Coefficient::VAdcC,
        Coefficient::VinAdcK,
        Coefficient::VinAdcC,
    ];

    /// Name used by the host protocol, e.g. `"A_ADC_K"`
    pub const fn name(self) -> &'static str {
        match self {
            Coefficient::AAdcK => "A_ADC_K",
            Coefficient::AAdcC => "A_ADC_C",
            Coefficient::ADacK => "A_DAC_K",
            Coefficient::ADacC => "A_DAC_C",
            Coefficient::VDacK => "V_DAC_K",
            Coefficient::VDacC => "V_DAC_C",
            Coefficient::VAdcK => "V_ADC_K",
            Coefficient::VAdcC => "V_ADC_C",
            Coefficient::VinAdcK => "VIN_ADC_K",
            Coefficient::VinAdcC => "VIN_ADC_C",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub const fn parameter(self) -> ParameterId {
        match self {
            Coefficient::AAdcK => ParameterId::AAdcK,
            Coefficient::AAdcC => ParameterId::AAdcC,
            Coefficient::ADacK => ParameterId::ADacK,
            Coefficient::ADacC => ParameterId::ADacC,
            Coefficient::VDacK => ParameterId::VDacK,
            Coefficient::VDacC => ParameterId::VDacC,
            Coefficient::VAdcK => ParameterId::VAdcK,
            Coefficient::VAdcC => ParameterId::VAdcC,
            Coefficient::VinAdcK => ParameterId::VinAdcK,
            Coefficient::VinAdcC => ParameterId::VinAdcC,
        }
    }
}

/// Calibration of current, voltage and input voltage conversions
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub a_adc_k: f32,
    pub a_adc_c: f32,
    pub a_dac_k: f32,
    pub a_dac_c: f32,
    pub v_dac_k: f32,
    pub v_dac_c: f32,
    pub v_adc_k: f32,
    pub v_adc_c: f32,
    pub vin_adc_k: f32,
    pub vin_adc_c: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Model::default().defaults()
    }
}

impl Calibration {
    pub fn get(&self, coefficient: Coefficient) -> f32 {
        match coefficient {
            Coefficient::AAdcK => self.a_adc_k,
            Coefficient::AAdcC => self.a_adc_c,
            Coefficient::ADacK => self.a_dac_k,
            Coefficient::ADacC => self.a_dac_c,
            Coefficient::VDacK => self.v_dac_k,
            Coefficient::VDacC => self.v_dac_c,
            Coefficient::VAdcK => self.v_adc_k,
            Coefficient::VAdcC => self.v_adc_c,
            Coefficient::VinAdcK => self.vin_adc_k,
            Coefficient::VinAdcC => self.vin_adc_c,
        }
    }

    pub fn set(&mut self, coefficient: Coefficient, value: f32) {
        let slot = match coefficient {
            Coefficient::AAdcK => &mut self.a_adc_k,
            Coefficient::AAdcC => &mut self.a_adc_c,
            Coefficient::ADacK => &mut self.a_dac_k,
            Coefficient::ADacC => &mut self.a_dac_c,
            Coefficient::VDacK => &mut self.v_dac_k,
            Coefficient::VDacC => &mut self.v_dac_c,
            Coefficient::VAdcK => &mut self.v_adc_k,
            Coefficient::VAdcC => &mut self.v_adc_c,
            Coefficient::VinAdcK => &mut self.vin_adc_k,
            Coefficient::VinAdcC => &mut self.vin_adc_c,
        };
        *slot = value;
    }

    /// Load stored coefficients over the model defaults
    ///
    /// Never fails: a missing or unreadable coefficient keeps its default.
    pub fn load<D: BlockDevice>(past: &Past<D>, model: Model) -> Self {
        let mut calibration = model.defaults();
        for coefficient in Coefficient::ALL {
            match param::load_f32(past, coefficient.parameter().as_u32()) {
                Ok(Some(value)) => calibration.set(coefficient, value),
                Ok(None) => {}
                Err(e) => {
                    warn!("calibration: {} unreadable ({}), using default", coefficient.name(), e);
                }
            }
        }
        calibration
    }

    /// Store every coefficient that differs from what is stored
    ///
    /// Returns the number of coefficients written.
    pub fn save<D: BlockDevice>(&self, past: &mut Past<D>) -> Result<usize, SettingsError> {
        let mut written = 0;
        for coefficient in Coefficient::ALL {
            let id = coefficient.parameter().as_u32();
            if param::update_f32(past, id, self.get(coefficient))? {
                written += 1;
            }
        }
        debug!("calibration: {} coefficients written", written);
        Ok(written)
    }

    /// Store a single coefficient by its protocol name
    pub fn store<D: BlockDevice>(past: &mut Past<D>, name: &str, value: f32) -> Result<(), SettingsError> {
        let coefficient = Coefficient::from_name(name).ok_or(SettingsError::UnknownParameter)?;
        param::update_f32(past, coefficient.parameter().as_u32(), value)
            .map(|_| ())
            .map_err(|e| {
                warn!("calibration: writing {} failed: {}", coefficient.name(), e);
                e
            })
    }

    /// Erase every stored coefficient, reverting to model defaults
    pub fn clear<D: BlockDevice>(past: &mut Past<D>) -> Result<(), SettingsError> {
        for coefficient in Coefficient::ALL {
            param::remove(past, coefficient.parameter().as_u32())?;
        }
        info!("calibration: cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mounted, reboot};

    #[test]
    fn test_defaults_without_stored_values() {
        let past = mounted();
        assert_eq!(Calibration::load(&past, Model::Dps5015), Model::Dps5015.defaults());
        assert_eq!(Calibration::load(&past, Model::Dps5015).a_adc_c, -394.06);
    }

    #[test]
    fn test_model_defaults() {
        let dps3005 = Model::Dps3005.defaults();
        assert_eq!(dps3005.a_dac_c, 262.5);
        assert_eq!(dps3005.v_adc_c, -111.9);
        assert_eq!(dps3005.vin_adc_k, 16.746);
        assert_eq!(Calibration::default(), Model::Dps5005.defaults());
    }

    #[test]
    fn test_partial_calibration_falls_back() {
        let mut past = mounted();
        Calibration::store(&mut past, "V_DAC_K", 0.0731).unwrap();
        Calibration::store(&mut past, "A_ADC_C", -120.5).unwrap();

        let past = reboot(past);
        let calibration = Calibration::load(&past, Model::Dps5005);
        let defaults = Model::Dps5005.defaults();
        assert_eq!(calibration.v_dac_k, 0.0731);
        assert_eq!(calibration.a_adc_c, -120.5);
        assert_eq!(calibration.v_dac_c, defaults.v_dac_c);
        assert_eq!(calibration.vin_adc_c, defaults.vin_adc_c);
    }

    #[test]
    fn test_unknown_name() {
        let mut past = mounted();
        let programs = past.flash().program_count();
        assert_eq!(
            Calibration::store(&mut past, "I_ADC_K", 1.0),
            Err(SettingsError::UnknownParameter)
        );
        assert_eq!(past.flash().program_count(), programs);
        assert_eq!(past.units().unwrap().count(), 0);
    }

    #[test]
    fn test_malformed_coefficient_uses_default() {
        let mut past = mounted();
        past.write(ParameterId::AAdcK.as_u32(), b"not a float").unwrap();
        let calibration = Calibration::load(&past, Model::Dp50v5a);
        assert_eq!(calibration.a_adc_k, 1.74096);
    }

    #[test]
    fn test_save_writes_only_changes() {
        let mut past = mounted();
        let mut calibration = Model::Dps5015.defaults();
        assert_eq!(calibration.save(&mut past), Ok(10));
        assert_eq!(calibration.save(&mut past), Ok(0));

        calibration.set(Coefficient::VinAdcK, 16.9);
        assert_eq!(calibration.save(&mut past), Ok(1));
        assert_eq!(Calibration::load(&past, Model::Dps5005), calibration);
    }

    #[test]
    fn test_clear() {
        let mut past = mounted();
        let mut calibration = Model::Dps5005.defaults();
        calibration.set(Coefficient::ADacK, 0.7);
        calibration.save(&mut past).unwrap();

        Calibration::clear(&mut past).unwrap();
        assert_eq!(past.units().unwrap().count(), 0);
        assert_eq!(Calibration::load(&past, Model::Dps5005), Model::Dps5005.defaults());
        // Clearing twice is fine
        assert_eq!(Calibration::clear(&mut past), Ok(()));
    }

    #[test]
    fn test_names() {
        for coefficient in Coefficient::ALL {
            assert_eq!(Coefficient::from_name(coefficient.name()), Some(coefficient));
        }
        assert_eq!(Coefficient::VinAdcC.parameter(), ParameterId::VinAdcC);
    }
}
