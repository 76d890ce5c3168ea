use image::imageops::FilterType;
use image::DynamicImage;

use super::ClassifierError;
use crate::models::{InputShape, Normalization, TensorLayout};

/// Batched input tensor (batch size 1), flattened in the layout given by `shape`
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl InputTensor {
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// Decode an encoded image (any format the `image` crate recognises)
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ClassifierError> {
    if bytes.is_empty() {
        return Err(ClassifierError::Preprocessing("empty image payload".to_string()));
    }
    image::load_from_memory(bytes)
        .map_err(|e| ClassifierError::Preprocessing(format!("failed to decode image: {}", e)))
}

/// Resize to the model input size, ignoring aspect ratio
pub fn resize(img: &DynamicImage, shape: InputShape) -> DynamicImage {
    if img.width() == shape.width && img.height() == shape.height {
        return img.clone();
    }
    img.resize_exact(shape.width, shape.height, FilterType::Triangle)
}

/// Convert an image into the model's input tensor: resize, scale pixel values,
/// lay out channels and prepend the batch dimension
pub fn to_tensor(img: &DynamicImage, shape: InputShape, normalization: Normalization) -> InputTensor {
    let resized = resize(img, shape);

    // Interleaved HWC bytes
    let pixels = match shape.channels {
        1 => resized.to_luma8().into_raw(),
        4 => resized.to_rgba8().into_raw(),
        _ => resized.to_rgb8().into_raw(),
    };

    let data = match shape.layout {
        TensorLayout::Nhwc => pixels.iter().map(|&v| normalization.apply(v)).collect(),
        TensorLayout::Nchw => {
            let channels = shape.channels as usize;
            let plane = (shape.height * shape.width) as usize;
            let mut data = vec![0.0f32; pixels.len()];
            for (i, &v) in pixels.iter().enumerate() {
                data[(i % channels) * plane + i / channels] = normalization.apply(v);
            }
            data
        }
    };

    InputTensor {
        shape: shape.dims(),
        data,
    }
}
