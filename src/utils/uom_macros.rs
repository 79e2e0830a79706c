#![warn(missing_docs)]
//! Module for uom macros that facilitate the creation of points or single unit values
/// helper macro to create the units
#[macro_export]
macro_rules! uom_unit_creator {

    ($unit:ident, $unit_type:ident, $val1:expr) => {
        $unit_type::new::<$unit>($val1)
    };
    ($unit:ident, $unit_type:ident, $val1:expr, $val2:expr) => {
        {
            use nalgebra::Point2;
        Point2::new(
            $unit_type::new::<$unit>($val1),
            $unit_type::new::<$unit>($val2))
        }

    };
    ($unit:ident, $unit_type:ident, $val1:expr, $val2:expr, $val3:expr) => {
        {
        use nalgebra::Point3;
        Point3::new(
            $unit_type::new::<$unit>($val1),
            $unit_type::new::<$unit>($val2),
            $unit_type::new::<$unit>($val3))
        }
    };
}

///macro to create a Length in meter
#[macro_export]
macro_rules! meter {
    ($( $x:expr ),*) =>{
        {
            use uom::si::{f64::Length, length::meter};
            $crate::uom_unit_creator![meter, Length, $( $x ),*]
        }
    };
}
///macro to create a Length in millimeter
#[macro_export]
macro_rules! millimeter {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Length, length::millimeter};
        $crate::uom_unit_creator![millimeter, Length, $( $x ),*]
    }};
}
///macro to create a Length in ångström (mostly used for neutron wavelengths)
#[macro_export]
macro_rules! angstrom {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Length, length::angstrom};
        $crate::uom_unit_creator![angstrom, Length, $( $x ),*]
    }};
}
///macro to create a Time in second
#[macro_export]
macro_rules! second {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Time, time::second};
        $crate::uom_unit_creator![second, Time, $( $x ),*]
    }};
}
///macro to create an Energy in electronvolt
#[macro_export]
macro_rules! electronvolt {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Energy, energy::electronvolt};
        $crate::uom_unit_creator![electronvolt, Energy, $( $x ),*]
    }};
}
///macro to create an Area in barn (nuclear cross sections)
#[macro_export]
macro_rules! barn {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Area, area::barn};
        $crate::uom_unit_creator![barn, Area, $( $x ),*]
    }};
}
///macro to create an angle in radian
#[macro_export]
macro_rules! radian {
    ($( $x:expr ),*) =>{{
        use uom::si::{f64::Angle, angle::radian};
        $crate::uom_unit_creator![radian, Angle, $( $x ),*]
    }};
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3};
    use uom::si::{
        area::square_meter, f64::Length, length::meter, time::second,
    };

    #[test]
    fn uom_unit_creator() {
        let meter1 = Length::new::<meter>(1.);
        let meter2 = uom_unit_creator!(meter, Length, 1.);
        assert_relative_eq!(meter1.value, meter2.value);

        let meterp12 = Point2::new(Length::new::<meter>(1.), Length::new::<meter>(2.));
        let meterp22 = uom_unit_creator!(meter, Length, 1., 2.);
        assert_relative_eq!(meterp12.x.value, meterp22.x.value);
        assert_relative_eq!(meterp12.y.value, meterp22.y.value);

        let meterp13 = Point3::new(
            Length::new::<meter>(1.),
            Length::new::<meter>(2.),
            Length::new::<meter>(3.),
        );
        let meterp23 = uom_unit_creator!(meter, Length, 1., 2., 3.);
        assert_relative_eq!(meterp13.x.value, meterp23.x.value);
        assert_relative_eq!(meterp13.y.value, meterp23.y.value);
        assert_relative_eq!(meterp13.z.value, meterp23.z.value);
    }
    #[test]
    fn neutron_units() {
        assert_relative_eq!(angstrom!(4.0).get::<meter>(), 4.0e-10);
        assert_relative_eq!(millimeter!(0.3).get::<meter>(), 3.0e-4);
        assert_relative_eq!(second!(2.0e-6).get::<second>(), 2.0e-6);
        assert_relative_eq!(barn!(0.171).get::<square_meter>(), 0.171e-28);
        assert_relative_eq!(electronvolt!(54.0e-9).value, 54.0e-9 * 1.602_176_634e-19);
    }
}
