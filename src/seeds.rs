//! Built-in content that keeps the app usable for a first try.

/// A fully de-identified sample discharge note for "try with a sample".
pub const SAMPLE_DISCHARGE_NOTE: &str = "Summary

This 5-year-old girl was admitted for evaluation of vomiting and frequent loose stools that began the day prior to presentation. Her mother reported reduced oral intake and fewer wet diapers. On arrival she appeared mildly dehydrated but alert, with normal temperature and no abdominal tenderness. There was no history of recent antibiotic use, travel, or sick contacts with bloody diarrhea.

She was started on IV fluids for rehydration and monitored for urine output and clinical improvement. No laboratory abnormalities requiring intervention were noted. Her vomiting resolved within several hours, and she began tolerating small amounts of oral fluids by the next morning. No signs developed to suggest bacterial gastroenteritis or a surgical cause for symptoms. By the time of discharge she was active, drinking adequately, and maintaining hydration without IV support.

Discharge Plan

She may continue oral rehydration solution at home as needed, especially if stool output increases again. Paracetamol can be given for discomfort or fever at a dose of 15 mg/kg every 6 hours as needed.

Families should avoid offering fruit juices, sodas, or sweetened drinks for the next couple of days, as these may worsen diarrhea. Heavy or greasy meals should also be avoided early on; smaller, more frequent portions are better tolerated. Anti-diarrheal medications should not be used unless specifically directed by a clinician.

Expected Course

Some loose stools may continue for the next 2-3 days, which is typical as the gastrointestinal tract recovers. Her appetite may return gradually, and she may have periods of mild cramping or lower energy, but overall hydration and activity should steadily improve. Caregivers should seek medical reassessment if vomiting returns and prevents oral intake, stools become bloody, urine output decreases, or if she appears unusually sleepy or weak.

Follow-Up

Follow up with her primary care provider in 2-3 days, or sooner if symptoms worsen or new concerns arise.";

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::IntakeCfg;
  use crate::intake::validate_text;

  #[test]
  fn sample_note_passes_intake() {
    assert!(validate_text(SAMPLE_DISCHARGE_NOTE, &IntakeCfg::default()).is_ok());
  }
}
