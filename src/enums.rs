#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmbusReadWrite {
    Write = 0,
    Read = 1,
}

/// Transaction sizes understood by the i2c-dev `I2C_SMBUS` ioctl.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmbusSize {
    Quick = 0,
    Byte = 1,
    ByteData = 2,
    WordData = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrMode {
    ReadOnly = 0o444,
    ReadWrite = 0o644,
}

impl AttrMode {
    pub fn writable(&self) -> bool {
        *self == AttrMode::ReadWrite
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxChip {
    Pca9541,
    Pca9543,
    Pca9545,
    Pca9547,
    Pca9548,
}

impl MuxChip {
    pub fn channels(&self) -> u8 {
        match self {
            MuxChip::Pca9541 => 1,
            MuxChip::Pca9543 => 2,
            MuxChip::Pca9545 => 4,
            MuxChip::Pca9547 | MuxChip::Pca9548 => 8,
        }
    }

    pub fn driver(&self) -> &'static str {
        match self {
            MuxChip::Pca9541 => "pca9541",
            MuxChip::Pca9543 => "pca9543",
            MuxChip::Pca9545 => "pca9545",
            MuxChip::Pca9547 => "pca9547",
            MuxChip::Pca9548 => "pca9548",
        }
    }
}

