use crate::types::Tag;

/// Receives decoded map elements while a query executes.
///
/// All slice arguments borrow the decoder's internal scratch buffers and
/// are valid only for the duration of the call; a consumer that wants to
/// keep them must copy.
pub trait RenderCallback {
    fn render_point_of_interest(&mut self, layer: i8, latitude: i32, longitude: i32, tags: &[Tag]);

    /// Delivers one way data block.
    ///
    /// `coordinates` holds interleaved `(longitude, latitude)` pairs in
    /// micro-degrees: the first `lengths[0]` values belong to the first
    /// coordinate block, the next `lengths[1]` to the second, and so on.
    /// `tags_changed` is false when `tags` is unchanged since the previous
    /// way of the same query, allowing consumers to reuse derived state.
    fn render_way(
        &mut self,
        layer: i8,
        tags: &[Tag],
        coordinates: &[f32],
        lengths: &[i32],
        text: &WayText<'_>,
        tags_changed: bool,
    );

    /// Called once per query when water background synthesis is enabled on
    /// the decoder and every visited block carried the water flag.
    fn render_water_background(&mut self) {}
}

/// Borrowed view of a way's optional strings and label position.
///
/// String fields are byte offsets into the string pool of the way sequence
/// the way was decoded from; they are resolved lazily against the pool
/// slice, which lives only as long as the `render_way` call.
pub struct WayText<'a> {
    pool: &'a [u8],
    name: Option<u32>,
    house_number: Option<u32>,
    reference: Option<u32>,
    label_position: Option<(i32, i32)>,
}

impl<'a> WayText<'a> {
    pub(crate) fn new(
        pool: &'a [u8],
        name: Option<u32>,
        house_number: Option<u32>,
        reference: Option<u32>,
        label_position: Option<(i32, i32)>,
    ) -> Self {
        Self {
            pool,
            name,
            house_number,
            reference,
            label_position,
        }
    }

    pub fn name(&self) -> Option<&'a str> {
        self.resolve(self.name)
    }

    pub fn house_number(&self) -> Option<&'a str> {
        self.resolve(self.house_number)
    }

    pub fn reference(&self) -> Option<&'a str> {
        self.resolve(self.reference)
    }

    /// Absolute label position as `(latitude, longitude)` micro-degrees.
    pub fn label_position(&self) -> Option<(i32, i32)> {
        self.label_position
    }

    fn resolve(&self, position: Option<u32>) -> Option<&'a str> {
        let mut pos = position? as usize;

        // length-prefixed UTF-8, the prefix being a variable byte uint
        let mut length = 0usize;
        let mut shift = 0u32;
        loop {
            let byte = *self.pool.get(pos)?;
            pos += 1;
            if byte & 0x80 == 0 {
                length |= (byte as usize) << shift;
                break;
            }
            length |= ((byte & 0x7f) as usize) << shift;
            shift += 7;
            if shift > 28 {
                return None;
            }
        }

        let bytes = self.pool.get(pos..pos + length)?;
        std::str::from_utf8(bytes).ok()
    }
}
