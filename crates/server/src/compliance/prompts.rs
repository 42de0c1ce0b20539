//! Language-model prompts for clause extraction and notice drafting.

/// System prompt for contract clause extraction.
pub const CONTRACT_EXTRACTION_SYSTEM: &str = r#"You are an expert construction contract analyst specializing in MEP (Mechanical, Electrical, Plumbing) subcontracts. Your task is to extract compliance-critical clauses from contract documents.

For each clause found, extract:
1. **kind** — One of: PAYMENT_TERMS, CHANGE_ORDER_PROCESS, CLAIMS_PROCEDURE, DISPUTE_RESOLUTION, NOTICE_REQUIREMENTS, RETENTION, WARRANTY, INSURANCE, INDEMNIFICATION, TERMINATION, FORCE_MAJEURE, LIQUIDATED_DAMAGES, SCHEDULE, SAFETY, GENERAL_CONDITIONS, SUPPLEMENTARY_CONDITIONS
2. **title** — A short descriptive title for the clause
3. **content** — The full verbatim text of the clause (preserve exact language)
4. **sectionRef** — The section/article reference (e.g., "Article 14.2", "Section 8.3.1")
5. **deadlineDays** — Number of days/hours for any deadline mentioned (integer or null)
6. **deadlineType** — One of: CALENDAR_DAYS, BUSINESS_DAYS, HOURS (or null if no deadline)
7. **noticeMethod** — One of: WRITTEN_NOTICE, CERTIFIED_MAIL, EMAIL, HAND_DELIVERY, REGISTERED_MAIL (or null)
8. **trigger** — What event triggers this obligation (e.g., "receipt of change directive", "discovery of differing site condition")
9. **curePeriodDays** — Cure/remedy period in days if mentioned (integer or null)
10. **curePeriodType** — One of: CALENDAR_DAYS, BUSINESS_DAYS, HOURS (or null)
11. **flowDownProvisions** — Any flow-down language referencing prime contract obligations
12. **parentClauseRef** — Reference to parent/prime contract clause if mentioned
13. **requiresReview** — Boolean: true if the clause is ambiguous, unusual, or potentially problematic
14. **reviewReason** — Explanation of why review is needed (or null)

Focus especially on:
- Notice deadlines (these protect claims rights — missing them = forfeited claims)
- Change order procedures and timelines
- Claims submission requirements
- Dispute resolution steps and deadlines
- Retention release conditions
- Warranty obligations and timelines
- Liquidated damages provisions
- Termination notice requirements

Return a JSON array of extracted clauses. If a section contains multiple distinct obligations, extract each separately."#;

/// Build the user prompt for contract clause extraction.
pub fn contract_extraction_user(document_name: &str, document_type: &str, document_text: &str) -> String {
    format!(
        r#"Analyze this contract document and extract all compliance-critical clauses.

Document: {document_name}
Document Type: {document_type}

--- DOCUMENT TEXT ---
{document_text}
--- END DOCUMENT TEXT ---

Return a JSON array of clause objects. Each object must have these fields:
{{"kind": "...", "title": "...", "content": "...", "sectionRef": "...", "deadlineDays": ..., "deadlineType": "...", "noticeMethod": "...", "trigger": "...", "curePeriodDays": ..., "curePeriodType": "...", "flowDownProvisions": "...", "parentClauseRef": "...", "requiresReview": ..., "reviewReason": "..."}}

Return ONLY the JSON array, no other text."#
    )
}

/// System prompt for notice letter generation.
pub const NOTICE_GENERATION_SYSTEM: &str = r#"You are a construction contract compliance specialist drafting formal contractual notices for MEP subcontractors. Your notices must be:

1. **Legally precise** — Reference exact contract sections, dates, and amounts
2. **Professionally formatted** — Proper business letter format with all required elements
3. **Protective of rights** — Explicitly preserve all rights, remedies, and entitlements
4. **Complete** — Include all elements required by the contract's notice provisions

Notice format must include:
- Date
- Proper addressee (with title and company)
- RE: line with project name and contract reference
- Clear statement of the notice type and triggering event
- Reference to specific contract clause requiring the notice
- Factual description of the circumstance
- Statement of impact (schedule, cost, or both)
- Reservation of rights language
- Request for response/action with timeline
- Signature block

CRITICAL: The notice must reference the specific contract clause that requires it, including section number and deadline requirements."#;

/// Inputs for the notice draft prompt.
#[derive(Debug, Clone)]
pub struct NoticePromptInputs<'a> {
    pub notice_type: &'a str,
    pub project_name: &'a str,
    pub clause_title: &'a str,
    pub clause_section_ref: Option<&'a str>,
    pub clause_content: &'a str,
    pub trigger_description: &'a str,
    pub trigger_date: chrono::NaiveDateTime,
    pub deadline_date: chrono::NaiveDateTime,
    pub notice_method: Option<&'a str>,
    pub from_name: &'a str,
    pub from_company: &'a str,
    pub to_name: &'a str,
    pub to_company: &'a str,
    pub to_email: &'a str,
    pub additional_context: Option<&'a str>,
}

/// Human-readable notice type label: "CHANGE_ORDER_NOTICE" -> "Change Order Notice".
pub fn notice_type_display(notice_type: &str) -> String {
    notice_type
        .split('_')
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the user prompt for notice letter generation.
pub fn notice_generation_user(inputs: &NoticePromptInputs<'_>) -> String {
    format!(
        r#"Draft a formal {notice_type} notice letter.

**Project:** {project_name}
**Contract Clause:** {clause_title} ({clause_section_ref})
**Clause Requirements:**
{clause_content}

**Trigger Event:** {trigger_description}
**Trigger Date:** {trigger_date}
**Deadline:** {deadline_date}
**Notice Method Required:** {notice_method}

**From (Subcontractor):**
{from_name}
{from_company}

**To (General Contractor):**
{to_name}
{to_company}
{to_email}

Additional context:
{additional_context}

Draft the complete notice letter. Use proper formatting with line breaks. The letter must:
1. Reference the specific contract clause ({clause_section_ref})
2. Describe the triggering event
3. State the required notice deadline
4. Preserve all rights and remedies
5. Request acknowledgment of receipt"#,
        notice_type = notice_type_display(inputs.notice_type),
        project_name = inputs.project_name,
        clause_title = inputs.clause_title,
        clause_section_ref = inputs.clause_section_ref.unwrap_or("N/A"),
        clause_content = inputs.clause_content,
        trigger_description = inputs.trigger_description,
        trigger_date = inputs.trigger_date.format("%B %d, %Y"),
        deadline_date = inputs.deadline_date.format("%B %d, %Y"),
        notice_method = inputs.notice_method.unwrap_or("WRITTEN_NOTICE"),
        from_name = inputs.from_name,
        from_company = inputs.from_company,
        to_name = inputs.to_name,
        to_company = inputs.to_company,
        to_email = inputs.to_email,
        additional_context = inputs.additional_context.unwrap_or("None"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn notice_type_display_titles_words() {
        assert_eq!(notice_type_display("CHANGE_ORDER_NOTICE"), "Change Order Notice");
        assert_eq!(notice_type_display("CLAIM_NOTICE"), "Claim Notice");
    }

    #[test]
    fn notice_prompt_includes_clause_and_dates() {
        let inputs = NoticePromptInputs {
            notice_type: "CLAIM_NOTICE",
            project_name: "Summit Tower",
            clause_title: "Claims Procedure",
            clause_section_ref: Some("Article 14.2"),
            clause_content: "Claims shall be submitted in writing...",
            trigger_description: "RFI #42 flagged as potential change order",
            trigger_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(12, 0, 0).unwrap(),
            deadline_date: NaiveDate::from_ymd_opt(2025, 3, 20).unwrap().and_hms_opt(23, 59, 59).unwrap(),
            notice_method: Some("WRITTEN_NOTICE"),
            from_name: "Pat Rivera",
            from_company: "Summit Tower",
            to_name: "General Contractor",
            to_company: "Apex Builders",
            to_email: "gc@apexbuilders.com",
            additional_context: None,
        };
        let prompt = notice_generation_user(&inputs);
        assert!(prompt.contains("Claim Notice"));
        assert!(prompt.contains("Article 14.2"));
        assert!(prompt.contains("March 10, 2025"));
        assert!(prompt.contains("March 20, 2025"));
        assert!(prompt.contains("Additional context:\nNone"));
    }
}
