use std::sync::Arc;

use log::trace;

use crate::common::{DbError, PageId, RecordId, Result, SlotId, TransactionId};
use crate::tuple::{Schema, Tuple};

/// Heap page layout for a schema whose records are `S` bytes, in a page of
/// `P` bytes:
///
/// ```text
/// +------------------------+
/// | Header bitmap          |  H = ceil(K / 8) bytes
/// |  bit i%8 of byte i/8   |  set when slot i is occupied
/// +------------------------+
/// | Slot 0                 |  S bytes
/// | Slot 1                 |
/// | ...                    |
/// | Slot K-1               |
/// +------------------------+
/// | Zero padding           |  up to P
/// +------------------------+
/// ```
///
/// where `K = floor(P * 8 / (S * 8 + 1))`: each slot costs S bytes plus one
/// header bit. Empty slots are all zeros on disk.
///
/// A page decoded in memory holds its records as [`Tuple`]s tagged with their
/// [`RecordId`], the transaction that dirtied it (if any) and a before-image
/// of its own bytes.
#[derive(Debug, Clone)]
pub struct HeapPage {
    page_id: PageId,
    schema: Arc<Schema>,
    page_size: usize,
    header: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    dirty: Option<TransactionId>,
    before_image: Vec<u8>,
}

impl HeapPage {
    /// Number of slots a page of `page_size` bytes holds for records of
    /// `tuple_size` bytes.
    pub fn slots_per_page(page_size: usize, tuple_size: usize) -> usize {
        (page_size * 8) / (tuple_size * 8 + 1)
    }

    pub fn header_size_for(num_slots: usize) -> usize {
        num_slots.div_ceil(8)
    }

    /// Bytes of a freshly allocated page.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// Decodes a page. The page size is the length of `data`.
    pub fn from_bytes(page_id: PageId, schema: Arc<Schema>, data: &[u8]) -> Result<Self> {
        let page_size = data.len();
        let tuple_size = schema.tuple_size();
        let num_slots = Self::slots_per_page(page_size, tuple_size);
        let header_size = Self::header_size_for(num_slots);

        if num_slots == 0 {
            return Err(DbError::InvalidPageData(format!(
                "a {} byte page cannot hold a {} byte record",
                page_size, tuple_size
            )));
        }

        let header = data[..header_size].to_vec();
        let mut slots = Vec::with_capacity(num_slots);

        for slot in 0..num_slots {
            if header[slot / 8] & (1 << (slot % 8)) == 0 {
                slots.push(None);
                continue;
            }
            let start = header_size + slot * tuple_size;
            let mut tuple = Tuple::from_bytes(schema.clone(), &data[start..start + tuple_size])?;
            tuple.set_record_id(Some(RecordId::new(page_id, SlotId::new(slot as u16))));
            slots.push(Some(tuple));
        }

        Ok(Self {
            page_id,
            schema,
            page_size,
            header,
            slots,
            dirty: None,
            before_image: data.to_vec(),
        })
    }

    /// A page with every slot free.
    pub fn new_empty(page_id: PageId, schema: Arc<Schema>, page_size: usize) -> Result<Self> {
        Self::from_bytes(page_id, schema, &Self::empty_page_data(page_size))
    }

    /// Encodes the page to exactly `page_size` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let tuple_size = self.schema.tuple_size();
        let mut data = Vec::with_capacity(self.page_size);
        data.extend_from_slice(&self.header);

        for slot in &self.slots {
            match slot {
                Some(tuple) => data.extend_from_slice(&tuple.to_bytes()?),
                None => data.resize(data.len() + tuple_size, 0),
            }
        }

        data.resize(self.page_size, 0);
        Ok(data)
    }

    /// Stores `tuple` in the first free slot and returns its new locator.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<RecordId> {
        if **tuple.schema() != *self.schema {
            return Err(DbError::SchemaMismatch);
        }

        let slot = (0..self.slots.len())
            .find(|&i| !self.is_slot_used(i))
            .ok_or(DbError::PageFull(self.page_id))?;

        // Surface encoding errors now rather than at flush time
        tuple.to_bytes()?;

        let record_id = RecordId::new(self.page_id, SlotId::new(slot as u16));
        tuple.set_record_id(Some(record_id));
        self.set_slot_used(slot, true);
        self.slots[slot] = Some(tuple);

        trace!("inserted {} on {}", record_id, self.page_id);
        Ok(record_id)
    }

    /// Frees the slot `tuple` was stored in.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let record_id = tuple
            .record_id()
            .ok_or_else(|| DbError::RecordNotFound("tuple has no record id".to_string()))?;

        let slot = record_id.slot_id.as_usize();
        let stored = match self.slots.get(slot) {
            Some(Some(stored)) if record_id.page_id == self.page_id => stored,
            _ => return Err(DbError::RecordNotFound(record_id.to_string())),
        };
        if stored.record_id() != Some(record_id) {
            return Err(DbError::RecordNotFound(record_id.to_string()));
        }

        self.set_slot_used(slot, false);
        self.slots[slot] = None;
        Ok(())
    }

    /// Sets (`dirty = true`) or clears the dirtying transaction.
    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionId) {
        self.dirty = if dirty { Some(tid) } else { None };
    }

    /// The transaction that last dirtied this page, or `None` when clean.
    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirty
    }

    /// The page as it was when the before-image was last captured.
    pub fn before_image(&self) -> Result<HeapPage> {
        HeapPage::from_bytes(self.page_id, self.schema.clone(), &self.before_image)
    }

    /// Captures the current contents as the before-image.
    pub fn set_before_image(&mut self) -> Result<()> {
        self.before_image = self.to_bytes()?;
        Ok(())
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn header_size(&self) -> usize {
        self.header.len()
    }

    pub fn num_empty_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    pub fn is_slot_used(&self, slot: usize) -> bool {
        slot < self.slots.len() && self.header[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot_used(&mut self, slot: usize, used: bool) {
        if used {
            self.header[slot / 8] |= 1 << (slot % 8);
        } else {
            self.header[slot / 8] &= !(1 << (slot % 8));
        }
    }

    /// Occupied slots in slot order.
    pub fn tuples(&self) -> impl Iterator<Item = &Tuple> {
        self.slots.iter().flatten()
    }
}
