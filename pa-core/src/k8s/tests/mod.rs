mod util_test;

use pa_testutils::*;

use super::*;
use crate::prelude::*;
