// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the most fundamental unit of the estimation engine. It is a
// "dumb" data container for a single RGB pixel plus the single-pixel heuristics the
// segmentation strategies threshold on. Nothing here looks at neighbours; blurring
// and percentile statistics live in the segmentation layer.
//
// Heuristic families:
// - Brightness: luminance (Rec. 601 luma) and its 8-bit quantisation, the
//   grayscale value the fixed-threshold strategy cuts on.
// - Opponent colour: the a* axis of CIE L*a*b* (D65). Blood pushes a* strongly
//   towards red, so this channel separates stain from most backgrounds far better
//   than brightness. It is also offered in the usual 8-bit encoding (a* + 128).

pub mod pixel {
    use palette::{FromColor, Lab, Srgb};

    pub type Channel = u8;
    pub type Luminance = f64;
    pub type OpponentA = f32;

    const A_CHANNEL_OFFSET: f32 = 128.0;

    /// A single 8-bit sRGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        /// Luminance estimate (Rec. 601 luma) on the 0..255 scale.
        pub fn luminance(&self) -> Luminance {
            0.299_f64 * self.red as f64 + 0.587_f64 * self.green as f64 + 0.114_f64 * self.blue as f64
        }

        /// Luminance rounded to the nearest 8-bit gray level.
        pub fn gray_level(&self) -> Channel {
            self.luminance().round().clamp(0.0, 255.0) as Channel
        }

        /// The a* (green-red) coordinate of this pixel in CIE L*a*b* under D65.
        /// Negative is green, positive is red.
        pub fn lab_a(&self) -> OpponentA {
            let srgb = Srgb::new(self.red, self.green, self.blue).into_format::<f32>();
            let lab: Lab = Lab::from_color(srgb);
            lab.a
        }

        /// a* shifted by 128 and quantised to a byte, so neutral gray sits at 128.
        pub fn lab_a_encoded(&self) -> Channel {
            (self.lab_a() + A_CHANNEL_OFFSET).round().clamp(0.0, 255.0) as Channel
        }
    }

    impl From<image::Rgb<u8>> for Pixel {
        fn from(rgb: image::Rgb<u8>) -> Self {
            let [red, green, blue] = rgb.0;
            Pixel::new(red, green, blue)
        }
    }
}
