//! Experiment weight selection.
//!
//! Maps (experiment group, mood supplied) to the five component weights of
//! the hybrid score. The control group additionally depends on whether the
//! CF model is loaded.

use data_loader::ExperimentGroup;

/// Component weights (personality, context, mood, personal, cf).
///
/// Need not sum to 1; the final score is clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightVector {
    pub personality: f32,
    pub context: f32,
    pub mood: f32,
    pub personal: f32,
    pub cf: f32,
}

impl WeightVector {
    pub const fn new(personality: f32, context: f32, mood: f32, personal: f32, cf: f32) -> Self {
        Self {
            personality,
            context,
            mood,
            personal,
            cf,
        }
    }

    pub fn total(&self) -> f32 {
        self.personality + self.context + self.mood + self.personal + self.cf
    }
}

/// Weights for one experiment arm, split by mood presence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmWeights {
    pub with_mood: WeightVector,
    pub without_mood: WeightVector,
}

impl ArmWeights {
    fn pick(&self, mood_present: bool) -> WeightVector {
        if mood_present {
            self.with_mood
        } else {
            self.without_mood
        }
    }
}

/// Control-group weights, split by mood presence and CF availability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlWeights {
    pub mood_cf: WeightVector,
    pub mood: WeightVector,
    pub cf: WeightVector,
    pub neither: WeightVector,
}

/// The full lookup table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightTable {
    pub control: ControlWeights,
    /// CF-heavy arm
    pub test_a: ArmWeights,
    /// Personal-heavy arm
    pub test_b: ArmWeights,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            control: ControlWeights {
                mood_cf: WeightVector::new(0.20, 0.15, 0.25, 0.15, 0.25),
                mood: WeightVector::new(0.25, 0.20, 0.30, 0.25, 0.0),
                cf: WeightVector::new(0.25, 0.20, 0.0, 0.30, 0.25),
                neither: WeightVector::new(0.35, 0.25, 0.0, 0.40, 0.0),
            },
            test_a: ArmWeights {
                with_mood: WeightVector::new(0.15, 0.10, 0.20, 0.15, 0.40),
                without_mood: WeightVector::new(0.20, 0.15, 0.0, 0.25, 0.40),
            },
            test_b: ArmWeights {
                with_mood: WeightVector::new(0.15, 0.10, 0.25, 0.40, 0.10),
                without_mood: WeightVector::new(0.20, 0.15, 0.0, 0.50, 0.15),
            },
        }
    }
}

impl WeightTable {
    pub fn with_test_a(mut self, arm: ArmWeights) -> Self {
        self.test_a = arm;
        self
    }

    pub fn with_test_b(mut self, arm: ArmWeights) -> Self {
        self.test_b = arm;
        self
    }

    pub fn with_control(mut self, control: ControlWeights) -> Self {
        self.control = control;
        self
    }

    /// Pure lookup; never fails
    pub fn select(
        &self,
        group: ExperimentGroup,
        mood_present: bool,
        cf_available: bool,
    ) -> WeightVector {
        match group {
            ExperimentGroup::TestA => self.test_a.pick(mood_present),
            ExperimentGroup::TestB => self.test_b.pick(mood_present),
            ExperimentGroup::Control => match (mood_present, cf_available) {
                (true, true) => self.control.mood_cf,
                (true, false) => self.control.mood,
                (false, true) => self.control.cf,
                (false, false) => self.control.neither,
            },
        }
    }
}
