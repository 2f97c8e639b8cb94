use image::Rgb;

pub const PALETTE: [Rgb<u8>; 20] = [
    Rgb([255, 0, 0]),
    Rgb([0, 255, 0]),
    Rgb([0, 0, 255]),
    Rgb([255, 255, 0]),
    Rgb([0, 255, 255]),
    Rgb([255, 0, 255]),
    Rgb([192, 192, 192]),
    Rgb([128, 128, 128]),
    Rgb([128, 0, 0]),
    Rgb([128, 128, 0]),
    Rgb([0, 128, 0]),
    Rgb([128, 0, 128]),
    Rgb([0, 128, 128]),
    Rgb([0, 0, 128]),
    Rgb([72, 61, 139]),
    Rgb([47, 79, 79]),
    Rgb([47, 79, 47]),
    Rgb([0, 206, 209]),
    Rgb([148, 0, 211]),
    Rgb([255, 20, 147]),
];

/// Color assigned to a class index.
pub fn color(class_index: usize) -> Rgb<u8> {
    PALETTE[class_index % PALETTE.len()]
}
