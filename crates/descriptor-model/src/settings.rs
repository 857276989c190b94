/// Recognized generator options and their safe defaults. See the
/// `descriptor-config` crate for parsing and validation from a flat option
/// map; this type is the plain data the rest of the subsystem consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorSettings {
    pub thread_count: usize,
    pub sampling_rate: u64,
    pub frame_buffer_length: usize,
    pub run_in_safe_mode: bool,
    pub process_tracks: bool,
    pub buffer_content_copy: bool,
    pub append_modality: bool,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            thread_count: 1,
            sampling_rate: 1,
            frame_buffer_length: 1,
            run_in_safe_mode: true,
            process_tracks: true,
            buffer_content_copy: false,
            append_modality: false,
        }
    }
}
