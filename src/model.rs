//! Two-block convolutional classifier.
//!
//! ```text
//! [b, 1, 28, 28] -> ConvBlock -> [b, h, 14, 14] -> ConvBlock -> [b, h, 7, 7]
//!                -> flatten   -> [b, h * 7 * 7] -> Linear    -> [b, num_classes]
//! ```

use burn::{
    nn::{
        Linear, LinearConfig, PaddingConfig2d, Relu,
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
    },
    prelude::*,
    train::ClassificationOutput,
};

/// Configuration for a [`ConvBlock`].
#[derive(Config, Debug)]
pub struct ConvBlockConfig {
    pub in_channels: usize,
    pub out_channels: usize,
}

impl ConvBlockConfig {
    /// Returns the initialized block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvBlock<B> {
        let conv = |in_channels| {
            Conv2dConfig::new([in_channels, self.out_channels], [3, 3])
                .with_stride([1, 1])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device)
        };
        ConvBlock {
            conv_1: conv(self.in_channels),
            conv_2: conv(self.out_channels),
            activation: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }
}

/// conv3x3 → relu → conv3x3 → relu → maxpool2x2.
///
/// The convolutions keep the spatial size, the pooling halves it.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv_1: Conv2d<B>,
    pub conv_2: Conv2d<B>,
    pub activation: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    /// # Shapes
    ///   - Input [batch, in_channels, height, width]
    ///   - Output [batch, out_channels, height / 2, width / 2]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [batch, _in_channels, height, width] = x.dims();

        let x = self.activation.forward(self.conv_1.forward(x));
        let x = self.activation.forward(self.conv_2.forward(x));
        let [_batch, out_channels, _height, _width] = x.dims();
        debug_assert_eq!([batch, out_channels, height, width], x.dims());

        let x = self.pool.forward(x);
        debug_assert_eq!([batch, out_channels, height / 2, width / 2], x.dims());
        x
    }
}

#[derive(Config, Debug)]
pub struct FashionCnnConfig {
    #[config(default = 1)]
    pub input_channels: usize,
    /// Channel width of every convolution.
    #[config(default = 10)]
    pub hidden_units: usize,
    #[config(default = 10)]
    pub num_classes: usize,
    /// Side of the square input images, must be divisible by 4.
    #[config(default = 28)]
    pub image_size: usize,
}

impl FashionCnnConfig {
    /// Returns the initialized model, with randomly initialized weights.
    pub fn init<B: Backend>(&self, device: &B::Device) -> FashionCnn<B> {
        assert_eq!(
            self.image_size % 4,
            0,
            "the image size must survive two 2x2 poolings"
        );
        let reduced = self.image_size / 4;
        FashionCnn {
            block_1: ConvBlockConfig::new(self.input_channels, self.hidden_units).init(device),
            block_2: ConvBlockConfig::new(self.hidden_units, self.hidden_units).init(device),
            classifier: LinearConfig::new(
                self.hidden_units * reduced * reduced,
                self.num_classes,
            )
            .with_bias(true)
            .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct FashionCnn<B: Backend> {
    pub block_1: ConvBlock<B>,
    pub block_2: ConvBlock<B>,
    pub classifier: Linear<B>,
}

impl<B: Backend> FashionCnn<B> {
    /// Returns the per-class logits.
    ///
    /// # Shapes
    ///   - Input [batch, input_channels, image_size, image_size]
    ///   - Output [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _channels, _height, _width] = images.dims();
        let [_features, num_classes] = self.classifier.weight.dims();

        let x = self.block_1.forward(images);
        let x = self.block_2.forward(x);

        let [_batch_size, hidden, height, width] = x.dims();
        let x = x.reshape([batch_size, hidden * height * width]);

        let x = self.classifier.forward(x);
        debug_assert_eq!([batch_size, num_classes], x.dims());
        x
    }

    /// Forward pass followed by the cross-entropy loss against `targets`.
    ///
    /// # Shapes
    ///   - images [batch, input_channels, image_size, image_size]
    ///   - targets [batch]
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let [batch_size, _channels, _height, _width] = images.dims();
        assert_eq!([batch_size], targets.dims());

        let output = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn default_config_matches_the_reference_architecture() {
        let config = FashionCnnConfig::new();
        assert_eq!(config.input_channels, 1);
        assert_eq!(config.hidden_units, 10);
        assert_eq!(config.num_classes, 10);
        assert_eq!(config.image_size, 28);

        let model: FashionCnn<TestBackend> = config.init(&Default::default());
        assert_eq!(model.classifier.weight.dims(), [10 * 7 * 7, 10]);
        assert_eq!(model.block_1.conv_1.weight.dims(), [10, 1, 3, 3]);
        assert_eq!(model.block_2.conv_2.weight.dims(), [10, 10, 3, 3]);
    }

    #[test]
    fn conv_block_halves_the_spatial_size() {
        let device = Default::default();
        let block: ConvBlock<TestBackend> = ConvBlockConfig::new(1, 4).init(&device);
        let x = Tensor::<TestBackend, 4>::ones([3, 1, 28, 28], &device);
        assert_eq!(block.forward(x).dims(), [3, 4, 14, 14]);
    }

    #[test]
    fn forward_yields_one_logit_per_class() {
        let device = Default::default();
        let model: FashionCnn<TestBackend> = FashionCnnConfig::new().init(&device);
        let images = Tensor::<TestBackend, 4>::random(
            [2, 1, 28, 28],
            burn::tensor::Distribution::Uniform(0., 1.),
            &device,
        );
        assert_eq!(model.forward(images).dims(), [2, 10]);
    }

    #[test]
    fn classification_loss_is_non_negative() {
        let device = Default::default();
        let model: FashionCnn<TestBackend> = FashionCnnConfig::new().init(&device);
        let images = Tensor::<TestBackend, 4>::zeros([4, 1, 28, 28], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 3, 5, 9], &device);

        let output = model.forward_classification(images, targets);
        assert_eq!(output.output.dims(), [4, 10]);
        assert!(output.loss.into_scalar() >= 0.0);
    }
}
