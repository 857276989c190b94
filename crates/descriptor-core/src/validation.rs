use descriptor_model::{DescriptorError, EmissionBuffer};

/// Drains `emission`, optionally validates every descriptor, optionally tags
/// each with a modality suffix, then pushes the (possibly tagged) result
/// back. On a validation failure the buffer is left empty: the caller is
/// expected to treat the step as failed and discard whatever was pending.
pub(crate) fn finalize_emission(
    emission: &EmissionBuffer,
    safe_mode: bool,
    modality: Option<&str>,
) -> Result<(), DescriptorError> {
    let mut pending = emission.drain();

    if safe_mode {
        for descriptor in &pending {
            descriptor.validate()?;
        }
    }

    if let Some(suffix) = modality {
        for descriptor in &mut pending {
            descriptor.tag_modality(suffix);
        }
    }

    for descriptor in pending {
        emission.push(descriptor);
    }
    Ok(())
}
