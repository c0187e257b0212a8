/// Running sum kept inside `±limit`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrator {
    current_value: f32,
    limit: f32,
}

impl Integrator {
    pub fn new(limit: f32) -> Self {
        Integrator {
            current_value: 0.0_f32,
            limit: sanitize_limit(limit),
        }
    }

    pub fn add_new_value(&mut self, value: f32, interval_seconds: f32) -> f32 {
        self.current_value =
            (self.current_value + value * interval_seconds).clamp(-self.limit, self.limit);
        self.current_value
    }

    pub fn get_current_value(&self) -> f32 {
        self.current_value
    }

    pub fn set_limit(&mut self, limit: f32) {
        self.limit = sanitize_limit(limit);
        self.current_value = self.current_value.clamp(-self.limit, self.limit);
    }

    pub fn reset(&mut self) {
        self.current_value = 0.0;
    }
}

// A negative or NaN limit would make `clamp` panic.
fn sanitize_limit(limit: f32) -> f32 {
    if limit > 0.0 {
        limit
    } else {
        0.0
    }
}
