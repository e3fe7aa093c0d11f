//! The `basic` manipulator: match an arriving switch (or simultaneous chord)
//! under a modifier requirement, consume it, and drive the configured `to`
//! emissions plus the to_if_alone / to_if_held_down / to_after_key_up /
//! to_delayed_action behaviors.

mod activation;

use crate::condition::Condition;
use crate::environment::ManipulatorEnvironment;
use crate::event_definition::EventDefinition;
use crate::from_event_definition::{FromEventDefinition, KeyUpWhen};
use crate::manipulators::ApplyContext;
use crate::parameters::Parameters;
use crate::timer::TimerKind;
use crate::to_event_definition::ToEventDefinition;
use activation::{Activation, DeferredKeyUp, PendingSimultaneous};
use core_events::{
    AbsoluteMs, DeviceId, Event, EventEntry, EventType, ModifierFlag, MomentarySwitchEvent,
    UnmarshalError, dump_for_error,
};
use serde_json::Value;
use smallvec::SmallVec;
use tracing::trace;

/// Deferred key-ups are manipulator-scoped, not activation-scoped: the tap
/// that queued one may belong to an activation that is already gone when the
/// key-up falls due.
const DEFERRED_TIMER_ID: u64 = 0;

#[derive(Debug)]
pub struct BasicManipulator {
    from: FromEventDefinition,
    to: SmallVec<[ToEventDefinition; 4]>,
    to_if_alone: Vec<ToEventDefinition>,
    to_if_held_down: Vec<ToEventDefinition>,
    to_after_key_up: Vec<ToEventDefinition>,
    to_if_invoked: Vec<ToEventDefinition>,
    to_if_canceled: Vec<ToEventDefinition>,
    conditions: Vec<Condition>,
    parameters: Parameters,

    activations: Vec<Activation>,
    pending_simultaneous: Option<PendingSimultaneous>,
    pending_key_ups: Vec<DeferredKeyUp>,
    next_activation_id: u64,
}

impl BasicManipulator {
    /// Programmatic constructor used by the simple-modifications builder.
    pub fn with_parts(
        from: FromEventDefinition,
        to: Vec<ToEventDefinition>,
        parameters: Parameters,
    ) -> Self {
        Self {
            from,
            to: to.into(),
            to_if_alone: Vec::new(),
            to_if_held_down: Vec::new(),
            to_after_key_up: Vec::new(),
            to_if_invoked: Vec::new(),
            to_if_canceled: Vec::new(),
            conditions: Vec::new(),
            parameters,
            activations: Vec::new(),
            pending_simultaneous: None,
            pending_key_ups: Vec::new(),
            next_activation_id: 1,
        }
    }

    /// Parse a full `basic` manipulator object. `base_parameters` carries
    /// the profile-level thresholds; a `parameters` object in the JSON
    /// overlays them.
    pub fn make_from_json(
        json: &Value,
        base_parameters: &Parameters,
    ) -> Result<Self, UnmarshalError> {
        let Some(object) = json.as_object() else {
            return Err(UnmarshalError::new(format!(
                "manipulator must be an object, but is `{}`",
                dump_for_error(json)
            )));
        };

        let mut from = None;
        let mut manipulator = Self::with_parts(
            FromEventDefinition::default(),
            Vec::new(),
            *base_parameters,
        );

        for (key, value) in object {
            match key.as_str() {
                "type" => {
                    if value.as_str() != Some("basic") {
                        return Err(UnmarshalError::new(format!(
                            "`type` must be `basic`, but is `{}`",
                            dump_for_error(value)
                        )));
                    }
                }
                "from" => from = Some(FromEventDefinition::parse(value)?),
                "to" => manipulator.to = ToEventDefinition::parse_list(value)?.into(),
                "to_if_alone" => manipulator.to_if_alone = ToEventDefinition::parse_list(value)?,
                "to_if_held_down" => {
                    manipulator.to_if_held_down = ToEventDefinition::parse_list(value)?;
                }
                "to_after_key_up" => {
                    manipulator.to_after_key_up = ToEventDefinition::parse_list(value)?;
                }
                "to_delayed_action" => {
                    let Some(delayed) = value.as_object() else {
                        return Err(UnmarshalError::new(format!(
                            "`to_delayed_action` must be an object, but is `{}`",
                            dump_for_error(value)
                        )));
                    };
                    for (delayed_key, delayed_value) in delayed {
                        match delayed_key.as_str() {
                            "to_if_invoked" => {
                                manipulator.to_if_invoked =
                                    ToEventDefinition::parse_list(delayed_value)?;
                            }
                            "to_if_canceled" => {
                                manipulator.to_if_canceled =
                                    ToEventDefinition::parse_list(delayed_value)?;
                            }
                            _ => {
                                return Err(UnmarshalError::new(format!(
                                    "unknown key `{delayed_key}` in `to_delayed_action`"
                                )));
                            }
                        }
                    }
                }
                "conditions" => {
                    let Some(entries) = value.as_array() else {
                        return Err(UnmarshalError::new(format!(
                            "`conditions` must be an array, but is `{}`",
                            dump_for_error(value)
                        )));
                    };
                    for entry in entries {
                        manipulator.conditions.push(Condition::make_from_json(entry)?);
                    }
                }
                "parameters" => manipulator.parameters.update_from_json(value)?,
                "description" => {}
                _ => {
                    return Err(UnmarshalError::new(format!(
                        "unknown key `{key}` in `{}`",
                        dump_for_error(json)
                    )));
                }
            }
        }

        let Some(from) = from else {
            return Err(UnmarshalError::new(format!(
                "`from` is not found in `{}`",
                dump_for_error(json)
            )));
        };
        manipulator.from = from;
        Ok(manipulator)
    }

    pub fn push_back_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn active(&self) -> bool {
        !self.activations.is_empty()
            || self.pending_simultaneous.is_some()
            || !self.pending_key_ups.is_empty()
    }

    pub fn needs_virtual_hid_pointing(&self) -> bool {
        self.all_to_lists().any(|def| {
            matches!(
                def.event_definition,
                EventDefinition::MouseKey(_)
                    | EventDefinition::MomentarySwitch(MomentarySwitchEvent::PointingButton(_))
            )
        })
    }

    fn all_to_lists(&self) -> impl Iterator<Item = &ToEventDefinition> {
        self.to
            .iter()
            .chain(&self.to_if_alone)
            .chain(&self.to_if_held_down)
            .chain(&self.to_after_key_up)
            .chain(&self.to_if_invoked)
            .chain(&self.to_if_canceled)
            .chain(&self.from.simultaneous_options.to_after_key_up)
    }

    fn conditions_hold(&self, env: &ManipulatorEnvironment) -> bool {
        self.conditions.iter().all(|condition| condition.evaluate(env))
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_activation_id;
        self.next_activation_id += 1;
        id
    }

    // -- entry handling ---------------------------------------------------

    pub fn apply(&mut self, entry: &EventEntry, consumed: &mut bool, ctx: &mut ApplyContext<'_>) {
        match entry.event_type {
            EventType::KeyDown => self.on_key_down(entry, consumed, ctx),
            EventType::KeyUp => self.on_key_up(entry, consumed, ctx),
            EventType::Single => {}
        }
    }

    fn on_key_down(&mut self, entry: &EventEntry, consumed: &mut bool, ctx: &mut ApplyContext<'_>) {
        let Some(switch) = entry.event.momentary_switch().cloned() else {
            return;
        };

        if *consumed {
            self.observe_foreign_key_down(entry, ctx);
            return;
        }
        if !self.conditions_hold(ctx.env) || !self.from.modifiers.matches(ctx.env.modifier_mask())
        {
            self.observe_foreign_key_down(entry, ctx);
            return;
        }

        if self.from.is_simultaneous() {
            self.on_simultaneous_key_down(switch, entry, consumed, ctx);
            return;
        }

        if !self.from.event_definitions[0].matches_momentary_switch(&switch) {
            self.observe_foreign_key_down(entry, ctx);
            return;
        }

        *consumed = true;
        self.interrupt_existing_activations(ctx);
        self.activate(vec![switch], entry, ctx);
    }

    fn on_simultaneous_key_down(
        &mut self,
        switch: MomentarySwitchEvent,
        entry: &EventEntry,
        consumed: &mut bool,
        ctx: &mut ApplyContext<'_>,
    ) {
        let Some(mut pending) = self.pending_simultaneous.take() else {
            // First constituent starts a collection window.
            let Some(definition_index) = self.from.find_unclaimed_match(&switch, &[]) else {
                self.observe_foreign_key_down(entry, ctx);
                return;
            };
            *consumed = true;
            let id = self.next_id();
            ctx.schedule(
                id,
                TimerKind::SimultaneousWindow,
                entry.time + self.parameters.simultaneous_threshold_milliseconds,
            );
            self.pending_simultaneous = Some(PendingSimultaneous {
                id,
                device_id: entry.device_id,
                buffered: vec![entry.clone()],
                matched: vec![definition_index],
                switches: vec![switch],
            });
            return;
        };

        let claimable = if entry.device_id == pending.device_id {
            self.from.find_unclaimed_match(&switch, &pending.matched)
        } else {
            None
        };
        let Some(definition_index) = claimable else {
            self.pending_simultaneous = Some(pending);
            if self.from.simultaneous_options.detect_key_down_uninterruptedly {
                self.flush_pending_simultaneous(ctx);
            }
            self.observe_foreign_key_down(entry, ctx);
            return;
        };

        *consumed = true;
        pending.buffered.push(entry.clone());
        pending.matched.push(definition_index);
        pending.switches.push(switch);

        if pending.matched.len() < self.from.event_definitions.len() {
            self.pending_simultaneous = Some(pending);
            return;
        }

        ctx.cancel(pending.id, Some(TimerKind::SimultaneousWindow));
        if self
            .from
            .simultaneous_options
            .key_down_order
            .permits(&pending.matched)
        {
            trace!(
                target: "manipulator.basic",
                keys = pending.switches.len(),
                "simultaneous_matched"
            );
            self.interrupt_existing_activations(ctx);
            self.activate(pending.switches, entry, ctx);
        } else {
            for buffered in pending.buffered {
                ctx.post(buffered);
            }
        }
    }

    fn on_key_up(&mut self, entry: &EventEntry, consumed: &mut bool, ctx: &mut ApplyContext<'_>) {
        if *consumed {
            return;
        }
        let Some(switch) = entry.event.momentary_switch().cloned() else {
            return;
        };

        let position = self.activations.iter().position(|activation| {
            activation.device_id == entry.device_id && activation.holds(&switch)
        });
        if let Some(position) = position {
            *consumed = true;
            let mut activation = self.activations.remove(position);
            activation.mark_released(&switch);
            let release_now = !activation.unwound
                && match self.from.simultaneous_options.key_up_when {
                    KeyUpWhen::Any => true,
                    KeyUpWhen::All => activation.fully_released(),
                };
            if release_now {
                self.release_activation(&mut activation, entry, ctx);
                activation.unwound = true;
            }
            if !activation.fully_released() {
                // Keep swallowing the remaining constituent key-ups.
                self.activations.insert(position, activation);
            }
            return;
        }

        // A chord constituent released before the chord completed: abort the
        // collection and let this key-up pass through after the buffered
        // key-downs.
        let aborts_pending = self
            .pending_simultaneous
            .as_ref()
            .is_some_and(|pending| {
                pending.device_id == entry.device_id && pending.switches.contains(&switch)
            });
        if aborts_pending {
            self.flush_pending_simultaneous(ctx);
        }
    }

    /// A key-down this manipulator did not consume still interrupts its live
    /// activations: the to_if_alone opportunity is gone.
    fn observe_foreign_key_down(&mut self, entry: &EventEntry, ctx: &mut ApplyContext<'_>) {
        if entry.event.momentary_switch().is_none() {
            return;
        }
        for activation in &mut self.activations {
            if activation.alone {
                activation.alone = false;
                ctx.cancel(activation.id, Some(TimerKind::ToIfAlone));
            }
        }
        if self.from.simultaneous_options.detect_key_down_uninterruptedly
            && self.pending_simultaneous.is_some()
        {
            self.flush_pending_simultaneous(ctx);
        }
    }

    /// A fresh match interrupts the aloneness of earlier activations of this
    /// same manipulator.
    fn interrupt_existing_activations(&mut self, ctx: &mut ApplyContext<'_>) {
        for activation in &mut self.activations {
            if activation.alone {
                activation.alone = false;
                ctx.cancel(activation.id, Some(TimerKind::ToIfAlone));
            }
        }
    }

    // -- activation lifecycle ---------------------------------------------

    fn activate(
        &mut self,
        switches: Vec<MomentarySwitchEvent>,
        template: &EventEntry,
        ctx: &mut ApplyContext<'_>,
    ) {
        let id = self.next_id();
        let now = template.time;
        let mut activation = Activation::new(id, template.clone(), switches);

        emit_down_list(&self.to, &mut activation, template, now, ctx);

        if !self.to_if_alone.is_empty() {
            ctx.schedule(
                id,
                TimerKind::ToIfAlone,
                now + self.parameters.to_if_alone_timeout_milliseconds,
            );
        }
        if !self.to_if_held_down.is_empty() {
            ctx.schedule(
                id,
                TimerKind::ToIfHeldDown,
                now + self.parameters.to_if_held_down_threshold_milliseconds,
            );
        }
        if !self.to_if_invoked.is_empty() || !self.to_if_canceled.is_empty() {
            activation.delayed_action_pending = true;
            ctx.schedule(
                id,
                TimerKind::ToDelayedAction,
                now + self.parameters.to_delayed_action_delay_milliseconds,
            );
        }

        trace!(target: "manipulator.basic", activation = id, "activated");
        self.activations.push(activation);
    }

    /// Wind down one activation on physical release: key-ups in reverse,
    /// to_if_alone when still alone, to_after_key_up, then the delayed-action
    /// cancellation.
    fn release_activation(
        &mut self,
        activation: &mut Activation,
        entry: &EventEntry,
        ctx: &mut ApplyContext<'_>,
    ) {
        let now = entry.time;
        ctx.cancel(activation.id, None);
        activation.unwind_emitted(entry, now, ctx);

        let alone_applies = activation.alone
            && !activation.halted
            && !self.to_if_alone.is_empty()
            && now.saturating_elapsed(activation.key_down_time)
                < self.parameters.to_if_alone_timeout_milliseconds;
        if alone_applies {
            emit_tap_list(&self.to_if_alone, &mut self.pending_key_ups, entry, now, ctx);
        }

        if !activation.halted {
            emit_tap_list(
                &self.to_after_key_up,
                &mut self.pending_key_ups,
                entry,
                now,
                ctx,
            );
            emit_tap_list(
                &self.from.simultaneous_options.to_after_key_up,
                &mut self.pending_key_ups,
                entry,
                now,
                ctx,
            );
        }

        if activation.delayed_action_pending {
            activation.delayed_action_pending = false;
            emit_tap_list(&self.to_if_canceled, &mut self.pending_key_ups, entry, now, ctx);
        }
    }

    fn flush_pending_simultaneous(&mut self, ctx: &mut ApplyContext<'_>) {
        if let Some(pending) = self.pending_simultaneous.take() {
            trace!(
                target: "manipulator.basic",
                buffered = pending.buffered.len(),
                "simultaneous_flushed"
            );
            ctx.cancel(pending.id, Some(TimerKind::SimultaneousWindow));
            for entry in pending.buffered {
                ctx.post(entry);
            }
        }
    }

    // -- timers -----------------------------------------------------------

    pub fn fire_timer(
        &mut self,
        kind: TimerKind,
        activation_id: u64,
        now: AbsoluteMs,
        ctx: &mut ApplyContext<'_>,
    ) {
        match kind {
            TimerKind::ToIfAlone => {
                if let Some(activation) = self.activation_mut(activation_id) {
                    activation.alone = false;
                }
            }
            TimerKind::ToIfHeldDown => {
                let Some(position) = self
                    .activations
                    .iter()
                    .position(|activation| activation.id == activation_id && !activation.unwound)
                else {
                    return;
                };
                let mut activation = self.activations.remove(position);
                if !activation.halted {
                    activation.alone = false;
                    let template = activation.original_entry.clone();
                    emit_down_list(&self.to_if_held_down, &mut activation, &template, now, ctx);
                }
                self.activations.insert(position, activation);
            }
            TimerKind::ToDelayedAction => {
                let Some(position) = self
                    .activations
                    .iter()
                    .position(|activation| activation.id == activation_id)
                else {
                    return;
                };
                if !self.activations[position].delayed_action_pending {
                    return;
                }
                self.activations[position].delayed_action_pending = false;
                let template = self.activations[position].original_entry.clone();
                emit_tap_list(&self.to_if_invoked, &mut self.pending_key_ups, &template, now, ctx);
            }
            TimerKind::SimultaneousWindow => {
                let stale = self
                    .pending_simultaneous
                    .as_ref()
                    .is_none_or(|pending| pending.id != activation_id);
                if !stale {
                    self.flush_pending_simultaneous(ctx);
                }
            }
            TimerKind::DeferredKeyUp => self.flush_due_key_ups(now, ctx),
        }
    }

    fn flush_due_key_ups(&mut self, now: AbsoluteMs, ctx: &mut ApplyContext<'_>) {
        let mut index = 0;
        while index < self.pending_key_ups.len() {
            if self.pending_key_ups[index].at <= now {
                let deferred = self.pending_key_ups.remove(index);
                ctx.post(deferred.entry);
            } else {
                index += 1;
            }
        }
    }

    fn activation_mut(&mut self, activation_id: u64) -> Option<&mut Activation> {
        self.activations
            .iter_mut()
            .find(|activation| activation.id == activation_id)
    }

    // -- lifecycle fan-out ------------------------------------------------

    /// Invalidation wind-down: outstanding key-ups and cancellation side
    /// effects only; no to_if_alone, no to_after_key_up.
    pub fn wind_down(&mut self, now: AbsoluteMs, ctx: &mut ApplyContext<'_>) {
        for mut activation in std::mem::take(&mut self.activations) {
            if !activation.unwound {
                let template = activation.original_entry.clone();
                activation.unwind_emitted(&template, now, ctx);
                if activation.delayed_action_pending {
                    emit_tap_list(&self.to_if_canceled, &mut self.pending_key_ups, &template, now, ctx);
                }
            }
        }
        // Chord collections in flight are dropped: their key-downs were never
        // emitted, so there is nothing to pair.
        self.pending_simultaneous = None;
        for deferred in std::mem::take(&mut self.pending_key_ups) {
            ctx.post(deferred.entry);
        }
    }

    pub fn handle_device_ungrabbed(
        &mut self,
        device_id: DeviceId,
        now: AbsoluteMs,
        ctx: &mut ApplyContext<'_>,
    ) {
        let mut kept = Vec::with_capacity(self.activations.len());
        for mut activation in std::mem::take(&mut self.activations) {
            if activation.device_id != device_id {
                kept.push(activation);
                continue;
            }
            ctx.cancel(activation.id, None);
            if !activation.unwound {
                let template = activation.original_entry.clone();
                activation.unwind_emitted(&template, now, ctx);
                if activation.delayed_action_pending {
                    emit_tap_list(&self.to_if_canceled, &mut self.pending_key_ups, &template, now, ctx);
                }
            }
        }
        self.activations = kept;

        if self
            .pending_simultaneous
            .as_ref()
            .is_some_and(|pending| pending.device_id == device_id)
        {
            if let Some(pending) = self.pending_simultaneous.take() {
                ctx.cancel(pending.id, Some(TimerKind::SimultaneousWindow));
            }
        }

        let mut index = 0;
        while index < self.pending_key_ups.len() {
            if self.pending_key_ups[index].entry.device_id == device_id {
                let deferred = self.pending_key_ups.remove(index);
                ctx.post(deferred.entry);
            } else {
                index += 1;
            }
        }
    }
}

// -- emission helpers -----------------------------------------------------

fn modifier_event(flag: ModifierFlag) -> Event {
    Event::MomentarySwitch(MomentarySwitchEvent::key_code(flag.key_code_name()))
}

/// Emit a to-list as held key-downs, recording each on the activation's
/// emitted stack so release unwinds them in reverse.
fn emit_down_list(
    defs: &[ToEventDefinition],
    activation: &mut Activation,
    template: &EventEntry,
    now: AbsoluteMs,
    ctx: &mut ApplyContext<'_>,
) {
    for def in defs {
        let Some(event) = def.event() else { continue };
        for flag in &def.modifiers {
            let modifier = modifier_event(*flag);
            ctx.post(
                template
                    .manipulated(modifier.clone(), EventType::KeyDown, now)
                    .with_lazy(def.lazy),
            );
            activation.push_emitted(modifier, def.lazy);
        }
        match &event {
            Event::MomentarySwitch(_) | Event::MouseKey(_) => {
                ctx.post(
                    template
                        .manipulated(event.clone(), EventType::KeyDown, now)
                        .with_lazy(def.lazy)
                        .with_repeat(def.repeat),
                );
                activation.push_emitted(event, def.lazy);
            }
            Event::SetVariable(set_variable) => {
                let has_key_up = set_variable.key_up_variant().is_some();
                ctx.post(template.manipulated(event.clone(), EventType::Single, now));
                if has_key_up {
                    activation.push_emitted(event, def.lazy);
                }
            }
            _ => {
                ctx.post(template.manipulated(event, EventType::Single, now));
            }
        }
        if def.halt {
            activation.halted = true;
        }
    }
}

/// Emit a to-list as immediate taps: key-down then key-up per entry, with
/// `hold_down_milliseconds` deferring the key-up through the timer registry.
fn emit_tap_list(
    defs: &[ToEventDefinition],
    pending_key_ups: &mut Vec<DeferredKeyUp>,
    template: &EventEntry,
    now: AbsoluteMs,
    ctx: &mut ApplyContext<'_>,
) {
    for def in defs {
        let Some(event) = def.event() else { continue };
        let modifiers: Vec<Event> = def.modifiers.iter().map(|flag| modifier_event(*flag)).collect();
        for modifier in &modifiers {
            ctx.post(
                template
                    .manipulated(modifier.clone(), EventType::KeyDown, now)
                    .with_lazy(def.lazy),
            );
        }
        match &event {
            Event::MomentarySwitch(_) | Event::MouseKey(_) => {
                ctx.post(
                    template
                        .manipulated(event.clone(), EventType::KeyDown, now)
                        .with_lazy(def.lazy)
                        .with_repeat(def.repeat),
                );
                if def.hold_down_milliseconds > 0 {
                    let at = now + def.hold_down_milliseconds;
                    pending_key_ups.push(DeferredKeyUp {
                        at,
                        entry: template
                            .manipulated(event.clone(), EventType::KeyUp, at)
                            .with_lazy(def.lazy),
                    });
                    for modifier in modifiers.iter().rev() {
                        pending_key_ups.push(DeferredKeyUp {
                            at,
                            entry: template
                                .manipulated(modifier.clone(), EventType::KeyUp, at)
                                .with_lazy(def.lazy),
                        });
                    }
                    ctx.schedule(DEFERRED_TIMER_ID, TimerKind::DeferredKeyUp, at);
                    continue;
                }
                ctx.post(
                    template
                        .manipulated(event.clone(), EventType::KeyUp, now)
                        .with_lazy(def.lazy),
                );
            }
            Event::SetVariable(set_variable) => {
                ctx.post(template.manipulated(event.clone(), EventType::Single, now));
                if let Some(key_up) = set_variable.key_up_variant() {
                    ctx.post(template.manipulated(
                        Event::SetVariable(key_up),
                        EventType::Single,
                        now,
                    ));
                }
            }
            _ => {
                ctx.post(template.manipulated(event.clone(), EventType::Single, now));
            }
        }
        for modifier in modifiers.iter().rev() {
            ctx.post(
                template
                    .manipulated(modifier.clone(), EventType::KeyUp, now)
                    .with_lazy(def.lazy),
            );
        }
    }
}

#[cfg(test)]
mod tests;
