/// Data layer: frame types, loading, and class selection.
///
/// Architecture:
/// ```text
///  .bin (x,y,z,i f32)   .label (u32, low 16 bits = class)
///        │                    │
///        ▼                    ▼
///   ┌──────────────────────────────┐
///   │            loader            │  sorted file pairs → FrameLoad
///   └──────────────────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model   │  Frame, SampleFrame, ClassPair
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ classes  │  valid classes → fixed list of class pairs
///   └──────────┘
/// ```

pub mod classes;
pub mod loader;
pub mod model;
