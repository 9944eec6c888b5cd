use serde::{Deserialize, Serialize};

use crate::Point;
use crate::stone::Stone;

/// Simple-ko lock: the point that may not be retaken and the color barred
/// from playing there. Cleared by any subsequent move or pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ko {
    pub pos: Point,
    pub illegal: Stone,
}
