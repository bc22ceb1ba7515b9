// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

mod driver_options;
mod request_options;
mod retry_options;

pub use driver_options::*;
pub use request_options::*;
pub use retry_options::*;
