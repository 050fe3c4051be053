//! Settings survive power cycles and leave unrelated settings alone

use dps_hal::RamFlash;
use dps_past::{Past, PastConfig};
use dps_settings::{Calibration, Coefficient, DisplaySettings, Model, OutputSettings};
use proptest::prelude::*;

type Flash = RamFlash<2048>;

fn mount(flash: Flash) -> Past<Flash> {
    let mut past = Past::new(flash, PastConfig::default()).unwrap();
    past.init().unwrap();
    past
}

fn model() -> impl Strategy<Value = Model> {
    prop_oneof![
        Just(Model::Dps5015),
        Just(Model::Dps5005),
        Just(Model::Dp50v5a),
        Just(Model::Dps3005),
    ]
}

proptest! {
    #[test]
    fn settings_survive_reboot(
        coefficients in proptest::collection::vec((0..10usize, -1.0e4f32..1.0e4), 0..30),
        model in model(),
        v_out_mv in 1..=u16::MAX,
        i_limit_ma in 1..=u16::MAX,
        inverted in any::<bool>(),
        brightness in 0..=100u8,
    ) {
        let mut past = mount(Flash::new());

        let mut expected = model.defaults();
        for (index, value) in coefficients {
            let coefficient = Coefficient::ALL[index];
            Calibration::store(&mut past, coefficient.name(), value).unwrap();
            expected.set(coefficient, value);
        }
        let output = OutputSettings { v_out_mv, i_limit_ma };
        output.save(&mut past).unwrap();
        let display = DisplaySettings { inverted, brightness };
        display.save(&mut past).unwrap();

        let past = mount(past.release());
        prop_assert_eq!(Calibration::load(&past, model), expected);
        prop_assert_eq!(OutputSettings::load(&past), output);
        prop_assert_eq!(DisplaySettings::load(&past), display);
    }
}
