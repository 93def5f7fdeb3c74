use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use geo::{coord, Coord};
use serde::{Deserialize, Serialize};

/// Maps geographic coordinates (x = longitude, y = latitude, in degrees) to a flat working
/// space and back. Straightening happens in the flat space.
pub trait Projection {
    fn project(&self, lonlat: Coord) -> Coord;
    fn invert(&self, xy: Coord) -> Coord;
}

impl<P: Projection + ?Sized> Projection for &P {
    fn project(&self, lonlat: Coord) -> Coord {
        (**self).project(lonlat)
    }
    fn invert(&self, xy: Coord) -> Coord {
        (**self).invert(xy)
    }
}

/// Spherical Mercator, as slippy maps draw it. Output is in pixels with y growing downwards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebMercator {
    /// Pixels per radian
    pub scale: f64,
    pub translate: Coord,
}

impl WebMercator {
    const TILE_SIZE: f64 = 256.0;

    pub fn new(scale: f64, translate: Coord) -> WebMercator {
        WebMercator { scale, translate }
    }

    /// The world as it's drawn at some zoom level, with (0, 0) in the middle.
    pub fn for_zoom(zoom: f64) -> WebMercator {
        WebMercator::new(
            Self::TILE_SIZE * 2.0_f64.powf(zoom) / (2.0 * PI),
            coord! { x: 0.0, y: 0.0 },
        )
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        WebMercator::for_zoom(0.0)
    }
}

impl Projection for WebMercator {
    fn project(&self, lonlat: Coord) -> Coord {
        let lambda = lonlat.x.to_radians();
        let phi = lonlat.y.to_radians();
        coord! {
            x: lambda * self.scale + self.translate.x,
            y: -(FRAC_PI_4 + phi / 2.0).tan().ln() * self.scale + self.translate.y,
        }
    }

    fn invert(&self, xy: Coord) -> Coord {
        let lambda = (xy.x - self.translate.x) / self.scale;
        let phi = 2.0 * (-(xy.y - self.translate.y) / self.scale).exp().atan() - FRAC_PI_2;
        coord! { x: lambda.to_degrees(), y: phi.to_degrees() }
    }
}

/// For coordinates that are already planar
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Identity;

impl Projection for Identity {
    fn project(&self, lonlat: Coord) -> Coord {
        lonlat
    }
    fn invert(&self, xy: Coord) -> Coord {
        xy
    }
}
