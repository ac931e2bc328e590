// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Format parsers, one per [`MeshFormat`](crate::MeshFormat)

mod dae;
mod obj;
mod ply;
mod stl;

pub use dae::DaeParser;
pub use obj::ObjParser;
pub use ply::PlyParser;
pub use stl::StlParser;
