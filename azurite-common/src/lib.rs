mod bits;

pub use bits::BitIndex;
