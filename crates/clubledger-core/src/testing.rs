//! Shared records for unit tests

use clubledger_client::memory::Fixture;

/// Two ledger entries, a completed and a failed payment and one sent invoice
pub(crate) fn fixture() -> Fixture {
    serde_json::from_value(serde_json::json!({
        "transactions": [
            {"_id": "t1", "type": "income", "category": "registration", "amount": 100,
             "description": "Spring registration", "date": "2024-03-01", "status": "completed"},
            {"_id": "t2", "type": "expense", "category": "equipment", "amount": 40,
             "description": "Cones", "date": "2024-03-02", "status": "completed"}
        ],
        "payments": [
            {"id": "p1", "payerName": "Sam Lee", "paymentType": "Registration", "amount": 200,
             "refundAmount": 0, "status": "completed", "paymentDate": "2024-03-01"},
            {"id": "p2", "payerName": "Kim Park", "paymentType": "Tournament", "amount": 30,
             "status": "failed", "paymentDate": "2024-03-05"}
        ],
        "invoices": [
            {"id": "i1", "invoiceNumber": "INV-1", "customerName": "Harbor United",
             "items": [{"description": "Kit", "quantity": 2, "unitPrice": 10, "amount": 20}],
             "subtotal": 20, "tax": 2, "total": 22, "status": "sent"}
        ]
    }))
    .unwrap()
}
